//! # Extracción de Texto
//! src/text/extract.rs
//!
//! Convierte los bytes descargados en texto plano. Nunca falla: las
//! secuencias UTF-8 inválidas se descartan y el HTML mal formado se parsea
//! igual (html5ever corrige lo que puede).

use scraper::Html;

/// Colaborador que pasa de bytes crudos a texto plano
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> String;
}

/// Quita el markup y concatena todos los nodos de texto del documento
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlTextExtractor;

impl TextExtractor for HtmlTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> String {
        let html = decode_utf8_dropping_invalid(bytes);
        let document = Html::parse_document(&html);
        document.root_element().text().collect()
    }
}

/// Decodifica UTF-8 ignorando (no reemplazando) los bytes inválidos
pub fn decode_utf8_dropping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
