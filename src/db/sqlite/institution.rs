//! Institution storage

use crate::db::sqlite::models::InstitutionRecord;
use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

fn to_json_text(value: &Option<Value>) -> Result<Option<String>> {
    Ok(value.as_ref().map(serde_json::to_string).transpose()?)
}

fn from_json_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
}

/// Insert or update institutions by aggregator id (single transaction)
pub fn upsert_institutions(conn: &mut Connection, records: &[InstitutionRecord]) -> Result<usize> {
    let tx = conn.transaction()?;

    let mut stmt = tx.prepare(
        "INSERT INTO institutions (
            id, name, code, display_name, institution_type, country_code, country_codes,
            website, primary_color, logo, icon_logo, text_logo, form_fields, features,
            integration_type, status, resources, openbanking_information
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            code = excluded.code,
            display_name = excluded.display_name,
            institution_type = excluded.institution_type,
            country_code = excluded.country_code,
            country_codes = excluded.country_codes,
            website = excluded.website,
            primary_color = excluded.primary_color,
            logo = excluded.logo,
            icon_logo = excluded.icon_logo,
            text_logo = excluded.text_logo,
            form_fields = excluded.form_fields,
            features = excluded.features,
            integration_type = excluded.integration_type,
            status = excluded.status,
            resources = excluded.resources,
            openbanking_information = excluded.openbanking_information,
            updated_at = datetime('now')",
    )?;

    for record in records {
        stmt.execute(params![
            record.id,
            record.name,
            record.code,
            record.display_name,
            record.institution_type,
            record.country_code,
            to_json_text(&record.country_codes)?,
            record.website,
            record.primary_color,
            record.logo,
            record.icon_logo,
            record.text_logo,
            to_json_text(&record.form_fields)?,
            to_json_text(&record.features)?,
            record.integration_type,
            record.status,
            to_json_text(&record.resources)?,
            to_json_text(&record.openbanking_information)?,
        ])?;
    }

    drop(stmt);
    tx.commit()?;

    tracing::info!("Stored {} institutions in database", records.len());
    Ok(records.len())
}

/// Get institution by business name
pub fn get_institution_by_name(conn: &Connection, name: &str) -> Result<Option<InstitutionRecord>> {
    let record = conn
        .query_row(
            "SELECT id, name, code, display_name, institution_type, country_code, country_codes,
                    website, primary_color, logo, icon_logo, text_logo, form_fields, features,
                    integration_type, status, resources, openbanking_information
             FROM institutions WHERE name = ?1",
            params![name],
            |row| {
                Ok(InstitutionRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    code: row.get(2)?,
                    display_name: row.get(3)?,
                    institution_type: row.get(4)?,
                    country_code: row.get(5)?,
                    country_codes: from_json_text(row, 6)?,
                    website: row.get(7)?,
                    primary_color: row.get(8)?,
                    logo: row.get(9)?,
                    icon_logo: row.get(10)?,
                    text_logo: row.get(11)?,
                    form_fields: from_json_text(row, 12)?,
                    features: from_json_text(row, 13)?,
                    integration_type: row.get(14)?,
                    status: row.get(15)?,
                    resources: from_json_text(row, 16)?,
                    openbanking_information: from_json_text(row, 17)?,
                })
            },
        )
        .optional()?;

    Ok(record)
}
