//! Test fixtures: ZIP archives, certificate payloads and catalog rows

use chrono::{NaiveDate, Utc};
use conocer_core::models::{
    CandidateUser, CertificateRecord, CertificateStatus, CompetencyStandard, ExtractedRecord,
};
use conocer_core::BlobTier;
use conocer_processing::{extract_from_text, FieldExtractor};
use std::io::{Cursor, Write};
use uuid::Uuid;
use zip::write::FileOptions;
use zip::ZipWriter;

pub const STANDARD_NAME: &str = "Impartición de cursos de formación del capital humano";

/// Build a ZIP in memory. Names ending in `/` become directory entries.
pub fn build_zip(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, data) in files {
        if let Some(dir) = name.strip_suffix('/') {
            writer.add_directory(dir, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

pub fn certificate_text(curp: &str, ecm_code: &str, folio: &str) -> String {
    format!(
        "CONSEJO NACIONAL DE NORMALIZACIÓN Y CERTIFICACIÓN DE COMPETENCIAS LABORALES\n\
         Hace constar que\n\
         JUAN PÉREZ GÓMEZ\n\
         CURP: {curp}\n\
         Ha demostrado ser competente en: {STANDARD_NAME}\n\
         Clave: {ecm_code}\n\
         Evaluado por: Centro Evaluador Ejemplo\n\
         Ciudad de México, a 2 de enero de 2026\n\
         Folio {folio}\n"
    )
}

/// Payload understood by [`TextExtractor`]: `%PDF` followed by page text.
pub fn certificate_pdf(curp: &str, ecm_code: &str) -> Vec<u8> {
    certificate_pdf_with(curp, ecm_code, "D-0001234567")
}

pub fn certificate_pdf_with(curp: &str, ecm_code: &str, folio: &str) -> Vec<u8> {
    format!("%PDF{}", certificate_text(curp, ecm_code, folio)).into_bytes()
}

/// Reads the bytes after `%PDF` as page text. Anything else is "not a PDF".
pub struct TextExtractor;

impl FieldExtractor for TextExtractor {
    fn extract(&self, data: &[u8]) -> ExtractedRecord {
        match data.strip_prefix(b"%PDF") {
            Some(text) => extract_from_text(&String::from_utf8_lossy(text)),
            None => ExtractedRecord::failed("not a PDF document"),
        }
    }
}

pub fn sample_user(curp: &str) -> CandidateUser {
    CandidateUser {
        id: Uuid::new_v4(),
        curp: Some(curp.to_string()),
        full_name: Some("Juan Pérez Gómez".to_string()),
    }
}

pub fn sample_standard(code: &str) -> CompetencyStandard {
    CompetencyStandard {
        id: Uuid::new_v4(),
        code: code.to_uppercase(),
        name: STANDARD_NAME.to_string(),
    }
}

/// An active certificate issued before the batch under test.
pub fn sample_certificate(user: &CandidateUser, standard: &CompetencyStandard) -> CertificateRecord {
    let now = Utc::now();
    CertificateRecord {
        id: Uuid::new_v4(),
        user_id: user.id,
        standard_id: standard.id,
        ecm_code: standard.code.clone(),
        certificate_number: format!("{}-20240301-0a1b2c3d", standard.code),
        folio: None,
        issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        standard_name: Some(standard.name.clone()),
        certifying_entity: None,
        blob_name: format!(
            "certificates/{}/{}/{}-20240301-0a1b2c3d_000000000000.pdf",
            user.id, standard.code, standard.code
        ),
        content_hash: "0".repeat(64),
        size_bytes: 7,
        storage_tier: BlobTier::Cool,
        status: CertificateStatus::Active,
        created_at: now,
        updated_at: now,
    }
}
