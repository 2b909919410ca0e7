//! # Lossy Mirror Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Architettura dei moduli:
//! - `codec`: descrittori, ricerca e registro dei codec esterni
//! - `converter`: pianificazione, conversione concorrente e riepilogo
//! - `config`: configurazione validata e impostazioni persistenti
//! - `error`: tipi di errore custom per ogni fase
//! - `file_manager`: estensioni, directory di destinazione, artwork
//! - `tags`: copia dei tag tra sorgente e file convertito
//! - `platform`: nomi eseguibili, PATH, CPU disponibili
//! - `progress` / `json_output`: feedback su terminale o in JSON
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use lossy_mirror::{CodecLocator, CodecRegistry, CodecTable, ConversionConfig, MediaConverter};
//!
//! let mut registry = CodecRegistry::new(CodecTable::builtin()?, CodecLocator::from_env());
//! registry.discover().await?;
//! let config = ConversionConfig::new(&source, &dest, registry.get_decoder("flac")?, registry.get_encoder("mp3")?)?;
//! let summary = MediaConverter::new(config).run().await?;
//! println!("{}", summary.format_summary());
//! ```

pub mod codec;
pub mod config;
pub mod converter;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod platform;
pub mod progress;
pub mod tags;

pub use codec::{CodecDefinition, CodecLocator, CodecRegistry, CodecTable, ResolvedCodec};
pub use config::{ConversionConfig, Settings};
pub use converter::{MediaConverter, RunSummary};
pub use error::{CodecError, ConfigError, ConversionError, PlanError, TagError};
pub use tags::{LoftyTagStore, TagStore};
