use url::form_urlencoded;

/// A request payload encoder. Supplies the `Content-type` header value and
/// the raw body bytes written after the header section.
pub trait RequestBody {
    fn content_type(&self) -> String;
    fn encode(&self) -> Vec<u8>;
}

/// Key/value pairs encoded as `application/x-www-form-urlencoded`.
#[derive(Clone, Debug, Default)]
pub struct UrlEncodedForm {
    params: Vec<(String, String)>,
}

impl UrlEncodedForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(&mut self, name: K, value: V) {
        self.params.push((name.into(), value.to_string()));
    }
}

impl RequestBody for UrlEncodedForm {
    fn content_type(&self) -> String {
        "application/x-www-form-urlencoded; charset=UTF-8".to_string()
    }

    fn encode(&self) -> Vec<u8> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.params {
            serializer.append_pair(name, value);
        }
        serializer.finish().into_bytes()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode_pairs_in_order() {
        let mut form = UrlEncodedForm::new();
        form.add("user", "alice");
        form.add("page", 2);
        form.add("verbose", true);
        assert_eq!(b"user=alice&page=2&verbose=true".to_vec(), form.encode());
    }

    #[test]
    fn test_encode_escapes_reserved_characters() {
        let mut form = UrlEncodedForm::new();
        form.add("q", "a b&c=d");
        assert_eq!(b"q=a+b%26c%3Dd".to_vec(), form.encode());
    }

    #[test]
    fn test_encode_non_ascii_as_utf8_percent_escapes() {
        let mut form = UrlEncodedForm::new();
        form.add("city", "münchen");
        assert_eq!(b"city=m%C3%BCnchen".to_vec(), form.encode());
    }

    #[test]
    fn test_empty_form_encodes_to_nothing() {
        let form = UrlEncodedForm::new();
        assert!(form.encode().is_empty());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(
            "application/x-www-form-urlencoded; charset=UTF-8",
            UrlEncodedForm::new().content_type()
        );
    }
}
