//! Static correction table for known transcription errors.
//!
//! Speech-to-text reliably garbles medication names the same few ways, so the
//! confusions are corrected before any matching runs. Keys and values are
//! lowercase.

use std::collections::HashMap;

/// Default transcription corrections: heard form -> canonical form.
pub fn default_corrections() -> HashMap<String, String> {
    let mut map = HashMap::new();

    // GLP-1 brands
    map.insert("ozempik".into(), "ozempic".into());
    map.insert("ozempick".into(), "ozempic".into());
    map.insert("osempic".into(), "ozempic".into());
    map.insert("o zempic".into(), "ozempic".into());
    map.insert("ozempek".into(), "ozempic".into());
    map.insert("wegovee".into(), "wegovy".into());
    map.insert("we govy".into(), "wegovy".into());
    map.insert("wagovy".into(), "wegovy".into());
    map.insert("monjaro".into(), "mounjaro".into());
    map.insert("moun jaro".into(), "mounjaro".into());
    map.insert("mount jaro".into(), "mounjaro".into());
    map.insert("manjaro".into(), "mounjaro".into());
    map.insert("true licity".into(), "trulicity".into());
    map.insert("truelicity".into(), "trulicity".into());
    map.insert("trulicety".into(), "trulicity".into());
    map.insert("rebelsus".into(), "rybelsus".into());
    map.insert("ribelsus".into(), "rybelsus".into());
    map.insert("rybelsis".into(), "rybelsus".into());

    // TNF biologics
    map.insert("humeera".into(), "humira".into());
    map.insert("humera".into(), "humira".into());
    map.insert("who mira".into(), "humira".into());
    map.insert("embrel".into(), "enbrel".into());
    map.insert("en brel".into(), "enbrel".into());
    map.insert("enbril".into(), "enbrel".into());

    // Generics
    map.insert("sema glutide".into(), "semaglutide".into());
    map.insert("semaglutied".into(), "semaglutide".into());
    map.insert("terzepatide".into(), "tirzepatide".into());
    map.insert("tirzepetide".into(), "tirzepatide".into());
    map.insert("adalimumad".into(), "adalimumab".into());
    map.insert("a dalimumab".into(), "adalimumab".into());

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_confusions_present() {
        let map = default_corrections();
        assert_eq!(map.get("ozempik").map(String::as_str), Some("ozempic"));
        assert_eq!(map.get("monjaro").map(String::as_str), Some("mounjaro"));
        assert_eq!(map.get("who mira").map(String::as_str), Some("humira"));
    }

    #[test]
    fn test_table_is_lowercase() {
        for (heard, canonical) in default_corrections() {
            assert_eq!(heard, heard.to_lowercase());
            assert_eq!(canonical, canonical.to_lowercase());
        }
    }
}
