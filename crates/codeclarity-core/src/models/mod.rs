//! Data models for CodeClarity resources.
//!
//! This module contains the wire types exchanged with the CodeClarity API:
//!
//! - Auth types: `AuthRequest`, `RefreshRequest`, `AuthTokens`, `User`
//! - `Analyzer`: analysis pipelines configured for an organization
//! - `Project`: imported repositories
//! - `Analysis`, `AnalysisStatus`: analysis runs and their lifecycle
//! - Result types: vulnerability, SBOM and license statistics
//! - `Paginated`, `Created`: collection and creation responses

pub mod analysis;
pub mod analyzer;
pub mod auth;
pub mod page;
pub mod project;
pub mod results;

pub use analysis::{Analysis, AnalysisCreateRequest, AnalysisStatus, AnalysisStep};
pub use analyzer::{Analyzer, AnalyzerCreateRequest, Stage};
pub use auth::{AuthRequest, AuthTokens, DefaultOrg, RefreshRequest, User};
pub use page::{Created, Paginated};
pub use project::{Project, ProjectImportRequest};
pub use results::{AffectedVuln, Epss, LicenseStats, SbomStats, Severity, Vulnerability, VulnerabilityStats};
