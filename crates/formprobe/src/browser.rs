//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature, [`Browser`] launches Chromium through
//! chromiumoxide and [`Page`] implements [`DomDriver`](crate::DomDriver):
//! node handles are `Runtime` remote object ids, element state is read with
//! `Runtime.callFunctionOn` and input goes through the `Input` domain.

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Initial window width
    pub viewport_width: u32,
    /// Initial window height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 800,
            viewport_height: 600,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Virtual key code and text for a named key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    /// `KeyboardEvent.key`
    pub key: String,
    /// `KeyboardEvent.code`, when known
    pub code: Option<String>,
    /// Windows virtual key code
    pub key_code: Option<i64>,
    /// Text inserted by the key
    pub text: Option<String>,
}

const NAMED_KEYS: &[(&str, i64, Option<&str>)] = &[
    ("Backspace", 8, None),
    ("Tab", 9, None),
    ("Enter", 13, Some("\r")),
    ("Shift", 16, None),
    ("Control", 17, None),
    ("Alt", 18, None),
    ("Escape", 27, None),
    ("End", 35, None),
    ("Home", 36, None),
    ("ArrowLeft", 37, None),
    ("ArrowUp", 38, None),
    ("ArrowRight", 39, None),
    ("ArrowDown", 40, None),
    ("Delete", 46, None),
];

impl KeyDefinition {
    /// Look up a named key, or treat `key` as the text it types
    #[must_use]
    pub fn for_key(key: &str) -> Self {
        if let Some(&(name, code, text)) = NAMED_KEYS.iter().find(|(name, ..)| *name == key) {
            return Self {
                key: name.to_string(),
                code: Some(name.to_string()),
                key_code: Some(code),
                text: text.map(str::to_string),
            };
        }

        let mut chars = key.chars();
        let key_code = match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphanumeric() => {
                Some(i64::from(u32::from(ch.to_ascii_uppercase())))
            }
            (Some(' '), None) => Some(32),
            _ => None,
        };
        Self {
            key: key.to_string(),
            code: None,
            key_code,
            text: Some(key.to_string()),
        }
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::{BrowserConfig, KeyDefinition};
    use crate::driver::{DomDriver, Point};
    use crate::result::{FormprobeError, FormprobeResult};
    use crate::selector::aria_name;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
        DispatchMouseEventType, MouseButton,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::{
        CallArgument, CallFunctionOnParams, EvaluateParams, ExceptionDetails, RemoteObject,
        RemoteObjectId,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use serde_json::Value;

    const QUERY_CSS: &str = "function (selector, index) {
        const found = this.querySelectorAll(selector);
        return index === undefined ? found.length : found[index];
    }";

    const QUERY_ARIA: &str = "function (name, index) {
        const textOf = (ids) => ids.split(/\\s+/)
            .map((id) => (document.getElementById(id) || {}).textContent || '')
            .join(' ');
        const accessibleName = (el) => {
            const label = el.getAttribute('aria-label');
            if (label) return label.trim();
            const labelledBy = el.getAttribute('aria-labelledby');
            if (labelledBy) return textOf(labelledBy).trim();
            if (el.labels && el.labels.length) {
                return Array.from(el.labels).map((l) => l.textContent).join(' ').trim();
            }
            if (el.matches('button, a, [role=button], [role=link]')) {
                return (el.textContent || '').trim();
            }
            return el.getAttribute('title') || '';
        };
        const found = Array.from(this.querySelectorAll('*'))
            .filter((el) => accessibleName(el) === name.trim());
        return index === undefined ? found.length : found[index];
    }";

    const SHADOW_ROOT: &str = "function () { return this.shadowRoot; }";

    const IS_CONNECTED: &str = "function () { return this.isConnected; }";

    const IS_VISIBLE: &str = "function () {
        const style = window.getComputedStyle(this);
        const rect = this.getBoundingClientRect();
        return !!style && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0;
    }";

    const INTERSECTS_VIEWPORT: &str = "function () {
        return new Promise((resolve) => {
            const observer = new IntersectionObserver((entries) => {
                resolve(entries[0].intersectionRatio > 0);
                observer.disconnect();
            });
            observer.observe(this);
        });
    }";

    const SCROLL_INTO_VIEW: &str = "function () {
        this.scrollIntoView({ block: 'center', inline: 'center', behavior: 'instant' });
    }";

    const TEXT_CONTENT: &str = "function () { return this.textContent; }";

    const BOUNDING_BOX: &str = "function () {
        const rect = this.getBoundingClientRect();
        return { x: rect.x, y: rect.y, width: rect.width, height: rect.height };
    }";

    const FOCUS: &str = "function () { this.focus(); }";

    #[derive(Debug, Deserialize)]
    struct BoundingBox {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    }

    fn page_error(e: impl std::fmt::Display) -> FormprobeError {
        FormprobeError::page(e.to_string())
    }

    fn input_error(e: impl std::fmt::Display) -> FormprobeError {
        FormprobeError::InputError {
            message: e.to_string(),
        }
    }

    fn exception_error(details: &ExceptionDetails) -> FormprobeError {
        let description = details
            .exception
            .as_ref()
            .and_then(|exception| exception.description.clone())
            .unwrap_or_else(|| details.text.clone());
        FormprobeError::page(format!("script threw: {description}"))
    }

    /// Browser instance with real CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: CdpBrowser,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch a new browser instance with real CDP
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> FormprobeResult<Self> {
            let mut builder =
                CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            if let Some(ref ua) = config.user_agent {
                builder = builder.arg(format!("--user-agent={ua}"));
            }

            let cdp_config = builder
                .build()
                .map_err(|message| FormprobeError::BrowserLaunchError { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                FormprobeError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            tracing::info!(headless = config.headless, "browser launched");
            Ok(Self {
                config,
                inner: browser,
                handle,
            })
        }

        /// Create a new page
        ///
        /// # Errors
        ///
        /// Returns error if page cannot be created
        pub async fn new_page(&self) -> FormprobeResult<Page> {
            let inner = self
                .inner
                .new_page("about:blank")
                .await
                .map_err(page_error)?;
            Ok(Page { inner })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser and reap its process
        pub async fn close(mut self) -> FormprobeResult<()> {
            let closed = self
                .inner
                .close()
                .await
                .map_err(|e| FormprobeError::BrowserLaunchError {
                    message: e.to_string(),
                });
            if let Err(err) = self.inner.wait().await {
                tracing::debug!(%err, "browser process did not exit cleanly");
            }
            self.handle.abort();
            tracing::info!("browser closed");
            closed.map(|_| ())
        }
    }

    /// A browser page with real CDP connection
    #[derive(Debug, Clone)]
    pub struct Page {
        inner: CdpPage,
    }

    impl Page {
        async fn call(
            &self,
            target: &RemoteObjectId,
            function: &str,
            args: Vec<Value>,
            return_by_value: bool,
        ) -> FormprobeResult<RemoteObject> {
            let arguments: Vec<CallArgument> = args
                .into_iter()
                .map(|value| CallArgument::builder().value(value).build())
                .collect();
            let params = CallFunctionOnParams::builder()
                .function_declaration(function)
                .object_id(target.clone())
                .arguments(arguments)
                .return_by_value(return_by_value)
                .await_promise(true)
                .build()
                .map_err(FormprobeError::page)?;

            let returns = self.inner.execute(params).await.map_err(page_error)?.result;
            if let Some(details) = &returns.exception_details {
                return Err(exception_error(details));
            }
            Ok(returns.result)
        }

        async fn value<T: DeserializeOwned>(
            &self,
            target: &RemoteObjectId,
            function: &str,
            args: Vec<Value>,
        ) -> FormprobeResult<T> {
            let object = self.call(target, function, args, true).await?;
            Ok(serde_json::from_value(object.value.unwrap_or(Value::Null))?)
        }

        async fn object(
            &self,
            target: &RemoteObjectId,
            function: &str,
            args: Vec<Value>,
        ) -> FormprobeResult<Option<RemoteObjectId>> {
            Ok(self.call(target, function, args, false).await?.object_id)
        }

        async fn dispatch_key(
            &self,
            kind: DispatchKeyEventType,
            definition: &KeyDefinition,
        ) -> FormprobeResult<()> {
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(kind.clone())
                .key(definition.key.clone());
            if let Some(ref code) = definition.code {
                builder = builder.code(code.clone());
            }
            if let Some(key_code) = definition.key_code {
                builder = builder.windows_virtual_key_code(key_code);
            }
            if matches!(kind, DispatchKeyEventType::KeyDown) {
                if let Some(ref text) = definition.text {
                    builder = builder.text(text.clone());
                }
            }
            let params = builder.build().map_err(input_error)?;
            self.inner.execute(params).await.map_err(input_error)?;
            Ok(())
        }

        async fn press(&self, definition: &KeyDefinition) -> FormprobeResult<()> {
            let kind = if definition.text.is_some() {
                DispatchKeyEventType::KeyDown
            } else {
                DispatchKeyEventType::RawKeyDown
            };
            self.dispatch_key(kind, definition).await
        }
    }

    #[async_trait]
    impl DomDriver for Page {
        type Handle = RemoteObjectId;

        async fn document(&self) -> FormprobeResult<RemoteObjectId> {
            let params = EvaluateParams::builder()
                .expression("document")
                .return_by_value(false)
                .build()
                .map_err(FormprobeError::page)?;
            let returns = self.inner.execute(params).await.map_err(page_error)?.result;
            returns
                .result
                .object_id
                .ok_or_else(|| FormprobeError::page("document has no remote object"))
        }

        async fn query_selector_all(
            &self,
            scope: &RemoteObjectId,
            selector: &str,
        ) -> FormprobeResult<Vec<RemoteObjectId>> {
            let (function, needle) = match aria_name(selector) {
                Some(name) => (QUERY_ARIA, name),
                None => (QUERY_CSS, selector),
            };
            let count: usize = self
                .value(scope, function, vec![Value::from(needle)])
                .await?;

            let mut found = Vec::with_capacity(count);
            for index in 0..count {
                let args = vec![Value::from(needle), Value::from(index)];
                if let Some(id) = self.object(scope, function, args).await? {
                    found.push(id);
                }
            }
            Ok(found)
        }

        async fn shadow_root(
            &self,
            element: &RemoteObjectId,
        ) -> FormprobeResult<Option<RemoteObjectId>> {
            self.object(element, SHADOW_ROOT, Vec::new()).await
        }

        async fn is_connected(&self, element: &RemoteObjectId) -> FormprobeResult<bool> {
            self.value(element, IS_CONNECTED, Vec::new()).await
        }

        async fn is_visible(&self, element: &RemoteObjectId) -> FormprobeResult<bool> {
            self.value(element, IS_VISIBLE, Vec::new()).await
        }

        async fn is_intersecting_viewport(&self, element: &RemoteObjectId) -> FormprobeResult<bool> {
            self.value(element, INTERSECTS_VIEWPORT, Vec::new()).await
        }

        async fn scroll_into_view(&self, element: &RemoteObjectId) -> FormprobeResult<()> {
            self.value(element, SCROLL_INTO_VIEW, Vec::new()).await
        }

        async fn text_content(&self, element: &RemoteObjectId) -> FormprobeResult<Option<String>> {
            self.value(element, TEXT_CONTENT, Vec::new()).await
        }

        async fn click(
            &self,
            element: &RemoteObjectId,
            offset: Option<Point>,
        ) -> FormprobeResult<()> {
            let rect: BoundingBox = self.value(element, BOUNDING_BOX, Vec::new()).await?;
            let at = offset.map_or_else(
                || Point::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0),
                |offset| Point::new(rect.x + offset.x, rect.y + offset.y),
            );

            for kind in [
                DispatchMouseEventType::MouseMoved,
                DispatchMouseEventType::MousePressed,
                DispatchMouseEventType::MouseReleased,
            ] {
                let mut builder = DispatchMouseEventParams::builder()
                    .r#type(kind.clone())
                    .x(at.x)
                    .y(at.y);
                if !matches!(kind, DispatchMouseEventType::MouseMoved) {
                    builder = builder.button(MouseButton::Left).click_count(1);
                }
                let params = builder.build().map_err(input_error)?;
                self.inner.execute(params).await.map_err(input_error)?;
            }
            Ok(())
        }

        async fn type_text(&self, element: &RemoteObjectId, text: &str) -> FormprobeResult<()> {
            self.value::<Value>(element, FOCUS, Vec::new()).await?;
            for ch in text.chars() {
                let definition = KeyDefinition::for_key(&ch.to_string());
                self.press(&definition).await?;
                self.dispatch_key(DispatchKeyEventType::KeyUp, &definition)
                    .await?;
            }
            Ok(())
        }

        async fn key_down(&self, key: &str) -> FormprobeResult<()> {
            self.press(&KeyDefinition::for_key(key)).await
        }

        async fn key_up(&self, key: &str) -> FormprobeResult<()> {
            self.dispatch_key(DispatchKeyEventType::KeyUp, &KeyDefinition::for_key(key))
                .await
        }

        async fn set_viewport(&self, width: u32, height: u32) -> FormprobeResult<()> {
            let params = SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(width))
                .height(i64::from(height))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(FormprobeError::page)?;
            self.inner.execute(params).await.map_err(page_error)?;
            Ok(())
        }

        async fn navigate(&self, url: &str) -> FormprobeResult<()> {
            self.inner
                .goto(url)
                .await
                .map_err(|e| FormprobeError::NavigationError {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn screenshot(&self) -> FormprobeResult<Vec<u8>> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();

            let screenshot =
                self.inner
                    .execute(params)
                    .await
                    .map_err(|e| FormprobeError::ScreenshotError {
                        message: e.to_string(),
                    })?;

            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| FormprobeError::ScreenshotError {
                    message: e.to_string(),
                })
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, Page};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = BrowserConfig::default();
            assert!(config.headless);
            assert!(config.sandbox);
            assert_eq!((config.viewport_width, config.viewport_height), (800, 600));
        }

        #[test]
        fn test_builder() {
            let config = BrowserConfig::default()
                .with_viewport(1167, 980)
                .with_headless(false)
                .with_chromium_path("/usr/bin/chromium")
                .with_user_agent("formprobe")
                .with_no_sandbox();
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.viewport_width, 1167);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert_eq!(config.user_agent.as_deref(), Some("formprobe"));
        }
    }

    mod key_tests {
        use super::*;

        #[test]
        fn test_tab_is_raw_key() {
            let tab = KeyDefinition::for_key("Tab");
            assert_eq!(tab.key_code, Some(9));
            assert_eq!(tab.code.as_deref(), Some("Tab"));
            assert_eq!(tab.text, None);
        }

        #[test]
        fn test_enter_types_carriage_return() {
            assert_eq!(KeyDefinition::for_key("Enter").text.as_deref(), Some("\r"));
        }

        #[test]
        fn test_character_keys() {
            let a = KeyDefinition::for_key("a");
            assert_eq!(a.key_code, Some(65));
            assert_eq!(a.text.as_deref(), Some("a"));

            let at = KeyDefinition::for_key("@");
            assert_eq!(at.key_code, None);
            assert_eq!(at.text.as_deref(), Some("@"));
        }
    }
}
