//! # Procesamiento de Texto
//! src/text/mod.rs
//!
//! - `extract`: HTML → texto plano (colaborador del worker)
//! - `frequency`: texto → K palabras más frecuentes

pub mod extract;
pub mod frequency;

pub use extract::{HtmlTextExtractor, TextExtractor};
pub use frequency::{top_k_words, WordCounts};
