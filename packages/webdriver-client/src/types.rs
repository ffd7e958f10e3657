use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Key under which W3C drivers serialize element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Unicode private-use code point the driver maps to the Enter key.
pub const ENTER_KEY: &str = "\u{E007}";

/// Every response body is `{"value": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValueEnvelope<T> {
    pub value: T,
}

/// Body of a failed command.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSessionValue {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(default)]
    pub capabilities: Value,
}

/// Reference to an element in the session's current document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    pub id: String,
}

/// Element lookup strategy. Only CSS selectors are used.
#[derive(Debug, Clone, Serialize)]
pub struct Locator<'a> {
    pub using: &'static str,
    pub value: &'a str,
}

impl<'a> Locator<'a> {
    pub fn css(selector: &'a str) -> Self {
        Self {
            using: "css selector",
            value: selector,
        }
    }
}

/// Capabilities requested when opening a Chrome session.
#[derive(Debug, Clone, Default)]
pub struct ChromeCapabilities {
    headless: bool,
    download_dir: Option<String>,
    args: Vec<String>,
}

impl ChromeCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Save downloads into `dir` without prompting.
    pub fn download_dir(mut self, dir: impl Into<String>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Body of the new-session request.
    pub fn to_json(&self) -> Value {
        let mut args = self.args.clone();
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut options = json!({ "args": args });
        if let Some(dir) = &self.download_dir {
            options["prefs"] = json!({
                "download.default_directory": dir,
                "download.prompt_for_download": false,
                "download.directory_upgrade": true,
                "plugins.always_open_pdf_externally": true,
            });
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": options,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_ref_wire_shape() {
        let element: ElementRef =
            serde_json::from_str(r#"{"element-6066-11e4-a52e-4f735466cecf": "abc"}"#).unwrap();
        assert_eq!(element.id, "abc");
        assert_eq!(serde_json::to_value(&element).unwrap()[ELEMENT_KEY], "abc");
    }

    #[test]
    fn test_elements_envelope() {
        let body = r#"{"value": [{"element-6066-11e4-a52e-4f735466cecf": "a"},
                                 {"element-6066-11e4-a52e-4f735466cecf": "b"}]}"#;
        let envelope: ValueEnvelope<Vec<ElementRef>> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.value.len(), 2);
        assert_eq!(envelope.value[1].id, "b");
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"value": {"error": "no such element", "message": "gone", "stacktrace": ""}}"#;
        let envelope: ValueEnvelope<ErrorValue> = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.value.error, "no such element");
        assert_eq!(envelope.value.message, "gone");
    }

    #[test]
    fn test_chrome_capabilities() {
        let caps = ChromeCapabilities::new()
            .headless(true)
            .download_dir("/tmp/dl")
            .to_json();
        let options = &caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"];

        assert_eq!(caps["capabilities"]["alwaysMatch"]["browserName"], "chrome");
        assert_eq!(options["args"][0], "--headless=new");
        assert_eq!(options["prefs"]["download.default_directory"], "/tmp/dl");
        assert_eq!(options["prefs"]["download.prompt_for_download"], false);
    }

    #[test]
    fn test_headed_without_downloads() {
        let caps = ChromeCapabilities::new().to_json();
        let options = &caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"];

        assert!(options["args"].as_array().unwrap().is_empty());
        assert!(options.get("prefs").is_none());
    }
}
