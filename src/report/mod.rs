//! Run reporting: what each stage consumed and produced, and how well the
//! chosen model scored.

pub mod run;

pub use run::RunReport;
