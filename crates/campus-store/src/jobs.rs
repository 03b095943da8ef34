//! Job postings.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub location: String,
    pub author_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobParams {
    pub title: String,
    pub company: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobParams {
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub location: Option<String>,
}

const JOB_COLUMNS: &str =
    "job_id, title, company, description, requirements_json, location, author_id, created_at";

pub fn create_job(
    conn: &Connection,
    author_id: &str,
    params: &CreateJobParams,
) -> Result<Job, StoreError> {
    let job_id = Uuid::new_v4().to_string();
    let requirements_json = serde_json::to_string(&params.requirements)?;
    let job = conn.query_row(
        &format!(
            "INSERT INTO jobs (job_id, title, company, description, requirements_json, location, author_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {JOB_COLUMNS}"
        ),
        params![
            job_id,
            params.title,
            params.company,
            params.description,
            requirements_json,
            params.location,
            author_id,
        ],
        map_row_to_job,
    )?;
    Ok(job)
}

pub fn get_job(conn: &Connection, job_id: &str) -> Result<Job, StoreError> {
    conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = ?1"),
        [job_id],
        map_row_to_job,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(job_id.to_string()))
}

/// Lists postings, newest first.
pub fn list_jobs(conn: &Connection) -> Result<Vec<Job>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], map_row_to_job)?;
    let mut jobs = Vec::new();
    for row in rows {
        jobs.push(row?);
    }
    Ok(jobs)
}

pub fn update_job(
    conn: &Connection,
    job_id: &str,
    updates: &UpdateJobParams,
) -> Result<Job, StoreError> {
    let requirements_json = updates
        .requirements
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.query_row(
        &format!(
            "UPDATE jobs SET
                title = COALESCE(?1, title),
                company = COALESCE(?2, company),
                description = COALESCE(?3, description),
                requirements_json = COALESCE(?4, requirements_json),
                location = COALESCE(?5, location)
             WHERE job_id = ?6
             RETURNING {JOB_COLUMNS}"
        ),
        params![
            updates.title,
            updates.company,
            updates.description,
            requirements_json,
            updates.location,
            job_id,
        ],
        map_row_to_job,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(job_id.to_string()))
}

pub fn delete_job(conn: &Connection, job_id: &str) -> Result<(), StoreError> {
    let count = conn.execute("DELETE FROM jobs WHERE job_id = ?1", [job_id])?;
    if count == 0 {
        return Err(StoreError::NotFound(job_id.to_string()));
    }
    Ok(())
}

fn map_row_to_job(row: &Row) -> rusqlite::Result<Job> {
    let requirements_json: String = row.get(4)?;
    let requirements: Vec<String> = serde_json::from_str(&requirements_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Job {
        id: row.get(0)?,
        title: row.get(1)?,
        company: row.get(2)?,
        description: row.get(3)?,
        requirements,
        location: row.get(5)?,
        author_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}
