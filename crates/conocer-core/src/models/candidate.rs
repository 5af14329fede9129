use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Candidate account, looked up by CURP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CandidateUser {
    pub id: Uuid,
    pub curp: Option<String>,
    pub full_name: Option<String>,
}

/// Competency standard ("estándar de competencia"), looked up by ECM code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CompetencyStandard {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// Certification paperwork ("trámite") state of a candidate assignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TramiteStatus {
    Pending,
    InProgress,
    Delivered,
}

impl TramiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TramiteStatus::Pending => "pending",
            TramiteStatus::InProgress => "in_progress",
            TramiteStatus::Delivered => "delivered",
        }
    }
}

impl Display for TramiteStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for TramiteStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TramiteStatus::Pending),
            "in_progress" => Ok(TramiteStatus::InProgress),
            "delivered" => Ok(TramiteStatus::Delivered),
            _ => Err(anyhow::anyhow!("Invalid tramite status: {}", s)),
        }
    }
}
