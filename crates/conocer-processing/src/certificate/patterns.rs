//! Field patterns for CONOCER certificate text.
//!
//! Each field has a strict pattern anchored on the label printed next to it
//! and, for the identity fields, a lenient fallback that scans the whole page.

use conocer_core::models::ExtractedRecord;
use regex::Regex;
use std::sync::LazyLock;

const CURP_SHAPE: &str = r"[A-Z]{4}\d{6}[HM][A-Z]{5}[A-Z0-9]\d";

static CURP_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:registro\s+de\s+poblaci[oó]n|curp)[^A-Za-z0-9]{{0,20}}({})\b",
        CURP_SHAPE
    ))
    .expect("valid CURP label regex")
});

// Text layers often glue words together, so the fallbacks take no leading boundary
static CURP_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)({})(?:\D|$)", CURP_SHAPE)).expect("valid CURP regex")
});

static ECM_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)clave\s*:\s*(ECM\d{4})\b").expect("valid ECM label regex")
});

static ECM_ANYWHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(ECM\d{4})(?:\D|$)").expect("valid ECM regex"));

static FOLIO_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(D-\d{10})\b").expect("valid folio regex"));

static FOLIO_LOOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(D-\d{7,})").expect("valid folio regex"));

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)hace\s+constar\s+que\s*:?\s*([^\n]{1,200})").expect("valid name regex")
});

static ECM_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)competente\s+en\s*:?\s*([^\n]{1,250})").expect("valid standard name regex")
});

pub(crate) static ISSUE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s*(?:o|º|°|\.)?\s+de\s+(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre)\s+(?:de|del)\s+(\d{4})\b",
    )
    .expect("valid issue date regex")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)evaluad[oa]\s+por\s*:?\s*([^\n]{1,200})").expect("valid entity regex")
});

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}\u{2007}\u{202f}]+").expect("valid whitespace regex"));

/// Collapse horizontal whitespace and drop blank lines.
pub fn normalize_text(text: &str) -> String {
    text.lines()
        .map(|line| HORIZONTAL_SPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Apply every field pattern to already extracted page text.
///
/// Never fails; fields that are not found stay `None`.
pub fn extract_from_text(text: &str) -> ExtractedRecord {
    let text = normalize_text(text);

    ExtractedRecord {
        curp: first_capture(&[&CURP_LABELED, &CURP_ANYWHERE], &text).map(|c| c.to_uppercase()),
        ecm_code: first_capture(&[&ECM_LABELED, &ECM_ANYWHERE], &text).map(|c| c.to_uppercase()),
        folio: first_capture(&[&FOLIO_STRICT, &FOLIO_LOOSE], &text),
        name: first_capture(&[&NAME], &text).and_then(|c| clean_name(&c)),
        ecm_name: first_capture(&[&ECM_NAME], &text).and_then(|c| clean_phrase(&c)),
        issue_date_text: ISSUE_DATE.find(&text).map(|m| m.as_str().to_string()),
        certifying_entity: first_capture(&[&ENTITY], &text).and_then(|c| clean_phrase(&c)),
        parse_error: None,
    }
}

fn first_capture(patterns: &[&Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn clean_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| !c.is_alphabetic());
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn clean_phrase(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '“' | '”' | '\''))
        .trim_end_matches(['.', ',', ';', ':'])
        .trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "CONSEJO NACIONAL DE NORMALIZACIÓN Y CERTIFICACIÓN DE COMPETENCIAS LABORALES\n\
        Hace constar que\n\
        MARÍA GUADALUPE LÓPEZ HERNÁNDEZ\n\
        Clave Única de Registro de Población: LOHG900215MDFPRD05\n\
        Ha demostrado ser competente en:\n\
        \"Impartición de cursos de formación del capital humano de manera presencial grupal\"\n\
        Clave: ECM0217\n\
        Evaluado por: Centro Evaluador Ejemplo.\n\
        Ciudad de México, a 2 de enero de 2026\n\
        Folio D-0001234567";

    #[test]
    fn test_extract_full_certificate() {
        let record = extract_from_text(SAMPLE);

        assert_eq!(record.curp.as_deref(), Some("LOHG900215MDFPRD05"));
        assert_eq!(record.ecm_code.as_deref(), Some("ECM0217"));
        assert_eq!(record.folio.as_deref(), Some("D-0001234567"));
        assert_eq!(record.name.as_deref(), Some("MARÍA GUADALUPE LÓPEZ HERNÁNDEZ"));
        assert_eq!(
            record.ecm_name.as_deref(),
            Some("Impartición de cursos de formación del capital humano de manera presencial grupal")
        );
        assert_eq!(record.issue_date_text.as_deref(), Some("2 de enero de 2026"));
        assert_eq!(record.certifying_entity.as_deref(), Some("Centro Evaluador Ejemplo"));
        assert!(record.parse_error.is_none());
    }

    #[test]
    fn test_curp_with_parenthesised_label() {
        let record = extract_from_text("Registro de Población (CURP): gomc850101hdfrrr09");
        assert_eq!(record.curp.as_deref(), Some("GOMC850101HDFRRR09"));
    }

    #[test]
    fn test_curp_fallback_without_label() {
        let record = extract_from_text("Candidato GOMC850101HDFRRR09 estándar ECM0217");
        assert_eq!(record.curp.as_deref(), Some("GOMC850101HDFRRR09"));
        assert_eq!(record.ecm_code.as_deref(), Some("ECM0217"));
    }

    #[test]
    fn test_fallbacks_find_codes_in_run_together_text() {
        let record = extract_from_text(
            "Candidato:JuanGOMC850101HDFRRR09 Norma tecnica de competencia laboralECM0217 emitida\nNumeroD-0001234567",
        );
        assert_eq!(record.curp.as_deref(), Some("GOMC850101HDFRRR09"));
        assert_eq!(record.ecm_code.as_deref(), Some("ECM0217"));
        assert_eq!(record.folio.as_deref(), Some("D-0001234567"));

        let record = extract_from_text("estándarecm0217emitido");
        assert_eq!(record.ecm_code.as_deref(), Some("ECM0217"));
    }

    #[test]
    fn test_fallbacks_reject_longer_digit_runs() {
        let record = extract_from_text("Referencia ECM02171 y GOMC850101HDFRRR091");
        assert!(record.ecm_code.is_none());
        assert!(record.curp.is_none());
    }

    #[test]
    fn test_labeled_ecm_wins_over_first_occurrence() {
        let record = extract_from_text("Ver también ECM0001\nClave: ECM0217");
        assert_eq!(record.ecm_code.as_deref(), Some("ECM0217"));
    }

    #[test]
    fn test_short_folio_fallback() {
        let record = extract_from_text("Folio: D-1234567");
        assert_eq!(record.folio.as_deref(), Some("D-1234567"));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let record = extract_from_text("Documento sin datos");
        assert_eq!(record, ExtractedRecord::default());
    }

    #[test]
    fn test_normalize_collapses_spaces() {
        assert_eq!(normalize_text("  a \t b\n\n   \nc  "), "a b\nc");
    }
}
