//! Locale negotiation and the error message catalogs.
//!
//! Error texts are kept in English and Hungarian. Requests in any other
//! supported locale get the English text.

use axum::http::{header::ACCEPT_LANGUAGE, HeaderMap};

/// Supported locales named by `Accept-Language`, highest quality first.
/// Equal weights keep header order and `q=0` entries are dropped.
pub fn preferred_locales<'a>(header: &'a str, supported: &[String]) -> Vec<&'a str> {
    let mut ranked: Vec<(&str, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            let quality = parts
                .filter_map(|param| param.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            Some((tag, quality))
        })
        .filter(|(tag, quality)| !tag.is_empty() && *tag != "*" && *quality > 0.0)
        .filter_map(|(tag, quality)| Some((tag.split('-').next()?, quality)))
        .filter(|(primary, _)| supported.iter().any(|s| s.eq_ignore_ascii_case(primary)))
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.into_iter().map(|(primary, _)| primary).collect()
}

/// The first supported locale in the request, or `default`.
pub fn negotiate(headers: &HeaderMap, supported: &[String], default: &str) -> String {
    headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| preferred_locales(header, supported).first().copied())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| default.to_string())
}

/// Localized text for an error code. `None` means the English message
/// carried by the error is used as is.
pub fn translate(locale: &str, code: &str) -> Option<&'static str> {
    match locale {
        "hu" => hungarian(code),
        _ => None,
    }
}

fn hungarian(code: &str) -> Option<&'static str> {
    let text = match code {
        "validation_error" => "Érvénytelen adatok",
        "user_exists" => "Ez az email cím vagy felhasználónév már foglalt",
        "invalid_credentials" => "Hibás email cím vagy jelszó",
        "email_not_verified" => "Az email cím nincs megerősítve",
        "user_not_found" => "Felhasználó nem található",
        "already_verified" => "Az email már megerősítve",
        "invalid_code" => "Érvénytelen kód",
        "code_expired" => "A kód lejárt. Kérj új kódot.",
        "too_many_attempts" => "Túl sok sikertelen próbálkozás. Kérj új kódot.",
        "resend_too_soon" => "Túl gyakran kértél új kódot. Próbáld újra később.",
        "unauthorized" => "Bejelentkezés szükséges",
        "session_expired" => "A munkamenet lejárt. Jelentkezz be újra.",
        "forbidden" => "Nincs jogosultságod ehhez a művelethez",
        "not_found" => "A keresett elem nem található",
        "machine_unavailable" => "A gép jelenleg nem elérhető",
        "reservation_conflict" => "Az időpont ütközik egy megerősített foglalással",
        "session_not_active" => "A mosási ciklus már nem aktív",
        "invalid_transition" => "A foglalás állapota így nem módosítható",
        "conflict" => "Ütközés történt",
        "internal_error" => "Szerver hiba",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn supported() -> Vec<String> {
        ["en", "hu", "de"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_first_supported_primary_tag() {
        let header = "es-ES,es;q=0.9,hu-HU;q=0.8,en;q=0.5";
        assert_eq!(preferred_locales(header, &supported()), vec!["hu", "en"]);
    }

    #[test]
    fn quality_weights_outrank_header_order() {
        let header = "en;q=0.1, hu;q=0.9, de";
        assert_eq!(preferred_locales(header, &supported()), vec!["de", "hu", "en"]);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en;q=0.1, hu;q=0.9"));
        assert_eq!(negotiate(&headers, &supported(), "en"), "hu");
    }

    #[test]
    fn zero_quality_excludes_a_locale() {
        let header = "hu;q=0, en;q=0.3";
        assert_eq!(preferred_locales(header, &supported()), vec!["en"]);
    }

    #[test]
    fn negotiation_falls_back_to_default() {
        let mut headers = HeaderMap::new();
        assert_eq!(negotiate(&headers, &supported(), "en"), "en");

        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr, *"));
        assert_eq!(negotiate(&headers, &supported(), "en"), "en");

        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("DE-at"));
        assert_eq!(negotiate(&headers, &supported(), "en"), "de");
    }

    #[test]
    fn only_hungarian_has_a_catalog() {
        assert_eq!(translate("hu", "invalid_code"), Some("Érvénytelen kód"));
        assert_eq!(translate("en", "invalid_code"), None);
        assert_eq!(translate("de", "invalid_code"), None);
        assert_eq!(translate("hu", "no_such_code"), None);
    }
}
