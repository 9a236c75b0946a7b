//! # Contador de Frecuencias
//! src/text/frequency.rs
//!
//! Función pura: texto + K → las K palabras más frecuentes.
//!
//! ## Reglas
//!
//! 1. Separar por cualquier secuencia de espacios o de `. , ; :`
//! 2. Pasar cada token a minúsculas
//! 3. Descartar tokens con algún carácter no alfabético
//! 4. Ordenar por conteo descendente; en empate gana la palabra que
//!    apareció primero en el texto
//!
//! El resultado se serializa como un objeto JSON en ese mismo orden:
//!
//! ```json
//! {"the": 3, "cat": 2}
//! ```

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::ser::Formatter;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::OnceLock;

fn separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[\s.,;:]+").expect("separator regex is valid"))
}

/// Pares (palabra, conteo) en orden de conteo descendente
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCounts(Vec<(String, usize)>);

/// Calcula las `top_k` palabras más frecuentes de `text`
///
/// # Ejemplo
///
/// ```
/// use topk_server::text::top_k_words;
///
/// let counts = top_k_words("the cat sat on the mat the cat ran", 2);
/// assert_eq!(counts.as_slice(), &[("the".to_string(), 3), ("cat".to_string(), 2)]);
/// ```
pub fn top_k_words(text: &str, top_k: usize) -> WordCounts {
    // Orden de primera aparición + índice para acumular
    let mut entries: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for token in separators().split(text) {
        if token.is_empty() {
            continue;
        }

        // Propiedad Unicode Alphabetic: además de letras (L*) acepta
        // números-letra (Nl, p. ej. `Ⅻ`) y signos vocálicos combinantes
        let word = token.to_lowercase();
        if !word.chars().all(char::is_alphabetic) {
            continue;
        }

        match index.get(&word) {
            Some(&i) => entries[i].1 += 1,
            None => {
                index.insert(word.clone(), entries.len());
                entries.push((word, 1));
            }
        }
    }

    // sort_by es estable: los empates conservan el orden de aparición
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(top_k);

    WordCounts(entries)
}

impl WordCounts {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[(String, usize)] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(word, count)| (word.as_str(), *count))
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.iter().find(|(w, _)| *w == word).map(|(_, count)| count)
    }

    /// Serializa como `{"word": count, ...}` con `": "` y `", "` como
    /// separadores. UTF-8 sin escapar.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(16 * self.len() + 2);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
        self.serialize(&mut serializer)?;
        Ok(out)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let bytes = self.to_json_bytes()?;
        // serde_json solo escribe UTF-8 válido
        Ok(String::from_utf8(bytes).unwrap_or_default())
    }
}

impl Serialize for WordCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (word, count) in &self.0 {
            map.serialize_entry(word, count)?;
        }
        map.end()
    }
}

/// Conserva el orden de las claves tal como vienen en el objeto
impl<'de> Deserialize<'de> for WordCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WordCountsVisitor;

        impl<'de> Visitor<'de> for WordCountsVisitor {
            type Value = WordCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from word to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<WordCounts, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((word, count)) = access.next_entry::<String, usize>()? {
                    entries.push((word, count));
                }
                Ok(WordCounts(entries))
            }
        }

        deserializer.deserialize_map(WordCountsVisitor)
    }
}

/// Formatter compacto con un espacio tras `:` y `,`
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(counts: &WordCounts) -> Vec<(&str, usize)> {
        counts.iter().collect()
    }

    #[test]
    fn test_basic_scenario() {
        let counts = top_k_words("the cat sat on the mat the cat ran", 2);
        assert_eq!(pairs(&counts), vec![("the", 3), ("cat", 2)]);
        assert_eq!(counts.to_json().unwrap(), r#"{"the": 3, "cat": 2}"#);
    }

    #[test]
    fn test_tie_break_first_seen() {
        // Todas con conteo 1: el orden es el de aparición
        let counts = top_k_words("zeta alpha mid", 3);
        assert_eq!(pairs(&counts), vec![("zeta", 1), ("alpha", 1), ("mid", 1)]);

        // "b" aparece antes que "a" y ambas tienen 2
        let counts = top_k_words("b a b a c", 2);
        assert_eq!(pairs(&counts), vec![("b", 2), ("a", 2)]);
    }

    #[test]
    fn test_lowercase_merges() {
        let counts = top_k_words("Rust rust RUST is great", 10);
        assert_eq!(counts.get("rust"), Some(3));
        assert_eq!(counts.get("Rust"), None);
    }

    #[test]
    fn test_punctuation_separators() {
        let counts = top_k_words("one.two,three;four:five\tsix\nseven", 10);
        assert_eq!(counts.len(), 7);
        assert_eq!(counts.as_slice()[0].0, "one");
    }

    #[test]
    fn test_non_alphabetic_tokens_dropped() {
        let counts = top_k_words("abc abc123 it's well-known 42 abc!", 10);
        assert_eq!(pairs(&counts), vec![("abc", 1)]);
    }

    #[test]
    fn test_unicode_letters_kept() {
        let counts = top_k_words("Canción canción día", 10);
        assert_eq!(pairs(&counts), vec![("canción", 2), ("día", 1)]);
        assert_eq!(counts.to_json().unwrap(), r#"{"canción": 2, "día": 1}"#);
    }

    #[test]
    fn test_alphabetic_property_includes_letter_numbers() {
        // Ⅻ (U+216B, Nl) se pasa a minúsculas como ⅻ y cuenta como palabra
        let counts = top_k_words("Ⅻ ⅻ rey", 10);
        assert_eq!(pairs(&counts), vec![("ⅻ", 2), ("rey", 1)]);

        // Devanagari con signo vocálico combinante (U+093F)
        let counts = top_k_words("हिंदी हिंदी", 10);
        assert_eq!(counts.get("हिंदी"), Some(2));

        // Dígitos de otras escrituras siguen fuera
        assert!(top_k_words("١٢٣ ४२", 10).is_empty());
    }

    #[test]
    fn test_fewer_than_k() {
        let counts = top_k_words("solo dos", 10);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_empty_text() {
        let counts = top_k_words("", 5);
        assert!(counts.is_empty());
        assert_eq!(counts.to_json().unwrap(), "{}");

        let counts = top_k_words(" ... ,,, 123 ", 5);
        assert!(counts.is_empty());
    }

    #[test]
    fn test_sorted_non_increasing() {
        let text = "a b c a b a d d d d e";
        let counts = top_k_words(text, 4);
        let values: Vec<usize> = counts.iter().map(|(_, c)| c).collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(pairs(&counts), vec![("d", 4), ("a", 3), ("b", 2), ("c", 1)]);
    }

    #[test]
    fn test_deterministic() {
        let text = "lorem ipsum dolor sit amet lorem dolor sit sit";
        let first = top_k_words(text, 3).to_json_bytes().unwrap();
        for _ in 0..10 {
            assert_eq!(top_k_words(text, 3).to_json_bytes().unwrap(), first);
        }
    }

    #[test]
    fn test_deserialize_preserves_order() {
        let counts: WordCounts = serde_json::from_str(r#"{"zeta": 5, "alpha": 5, "mid": 1}"#).unwrap();
        assert_eq!(pairs(&counts), vec![("zeta", 5), ("alpha", 5), ("mid", 1)]);
    }
}
