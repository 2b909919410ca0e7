//! # Converter Module
//!
//! Pipeline di conversione, dalla scansione della sorgente al riepilogo:
//! - `path_resolver`: path di destinazione e temporanei
//! - `planner`: lista dei job, directory da creare, artwork da copiare
//! - `task_converter`: conversione di un singolo file (decoder | encoder)
//! - `media_converter`: scheduler a concorrenza limitata e orchestrazione
//! - `run_result`: aggregazione thread-safe degli esiti

pub mod media_converter;
pub mod path_resolver;
pub mod planner;
pub mod run_result;
pub mod task_converter;

pub use media_converter::MediaConverter;
pub use planner::{ArtworkCopy, ConversionJob, ConversionPlan, ConversionPlanner};
pub use run_result::{JobOutcome, RunResult, RunSummary, TagOutcome};
pub use task_converter::{TaskConverter, TaskOptions};
