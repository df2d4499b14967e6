use reqwest::Url;
use thiserror::Error;

/// Mexican mobile numbers are dialled through the `52` country code.
const WHATSAPP_COUNTRY_CODE: &str = "52";

#[derive(Debug, Error)]
#[error("invalid contact link: {0}")]
pub(crate) struct ContactLinkError(String);

#[derive(Debug, Clone)]
pub(crate) struct ContactMessage<'a> {
    pub(crate) name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) message: &'a str,
}

fn parse(raw: &str) -> Result<Url, ContactLinkError> {
    Url::parse(raw).map_err(|err| ContactLinkError(format!("{raw}: {err}")))
}

fn body_text(msg: &ContactMessage<'_>) -> String {
    format!("Nombre: {}\nCorreo: {}\n\n{}", msg.name.trim(), msg.email.trim(), msg.message.trim())
}

pub(crate) fn mailto_url(to: &str, msg: &ContactMessage<'_>) -> Result<Url, ContactLinkError> {
    let mut url = parse(&format!("mailto:{to}"))?;
    url.query_pairs_mut()
        .append_pair("subject", &format!("Contacto de {}", msg.name.trim()))
        .append_pair("body", &body_text(msg));
    Ok(url)
}

pub(crate) fn whatsapp_url(number: &str, msg: &ContactMessage<'_>) -> Result<Url, ContactLinkError> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    let full = if digits.starts_with(WHATSAPP_COUNTRY_CODE) && digits.len() > 10 {
        digits
    } else {
        format!("{WHATSAPP_COUNTRY_CODE}{digits}")
    };

    let mut url = parse("https://wa.me/")?;
    url.set_path(&full);
    url.query_pairs_mut().append_pair("text", &body_text(msg));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> ContactMessage<'static> {
        ContactMessage {
            name: "Ana López",
            email: "ana@example.com",
            message: "Quiero información sobre inglés",
        }
    }

    #[test]
    fn mailto_encodes_subject_and_body() {
        let url = mailto_url("clubpoliglotamx@gmail.com", &message()).unwrap();
        assert_eq!(url.scheme(), "mailto");
        assert_eq!(url.path(), "clubpoliglotamx@gmail.com");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("subject".to_string(), "Contacto de Ana López".to_string()));
        assert!(pairs[1].1.contains("ana@example.com"));
        assert!(pairs[1].1.ends_with("Quiero información sobre inglés"));
    }

    #[test]
    fn whatsapp_prefixes_country_code_once() {
        let url = whatsapp_url("6143977741", &message()).unwrap();
        assert!(url.as_str().starts_with("https://wa.me/526143977741?text="));

        let url = whatsapp_url("+52 614 397 7741", &message()).unwrap();
        assert_eq!(url.path(), "/526143977741");
    }
}
