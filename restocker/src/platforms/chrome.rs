//! Surface backed by a Chrome tab over the DevTools protocol.
//!
//! Probes and value changes run as small functions inside the page, bound to
//! the element's remote object. A handle whose node has been removed from the
//! DOM reports `is_attached() == false`.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::{Element, Page};
use serde_json::Value;
use tracing::debug;

use crate::element::{UIElement, UIElementImpl};
use crate::errors::AutomationError;
use crate::platforms::Surface;
use crate::selector::Selector;

const ANCHOR_ATTRIBUTE: &str = "data-restocker-anchor";

const IS_VISIBLE_JS: &str = r#"function() {
    if (!this.isConnected) return false;
    const style = window.getComputedStyle(this);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const rect = this.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
}"#;

const IS_ENABLED_JS: &str = r#"function() {
    return !this.disabled && this.getAttribute('aria-disabled') !== 'true';
}"#;

const IS_ATTACHED_JS: &str = "function() { return this.isConnected; }";

const SCROLL_INTO_VIEW_JS: &str =
    "function() { this.scrollIntoView({ block: 'center', inline: 'nearest' }); }";

// True when the element's centre is not covered by something else
const HIT_TEST_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const hit = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
    return hit !== null && (hit === this || this.contains(hit));
}"#;

const SYNTHETIC_CLICK_JS: &str = "function() { this.click(); }";

// Goes through the prototype setter so framework-managed inputs accept the value
const SET_VALUE_JS: &str = r#"function() {
    const value = __VALUE__;
    this.focus();
    const descriptor = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(this), 'value');
    if (descriptor && descriptor.set) {
        descriptor.set.call(this, value);
    } else {
        this.value = value;
    }
}"#;

const DISPATCH_CHANGE_JS: &str = r#"function() {
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
}"#;

// Evaluated in the page; returns how many element matches were marked
const MARK_XPATH_JS: &str = r#"(() => {
    const result = document.evaluate(
        __XPATH__, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    let marked = 0;
    for (let i = 0; i < result.snapshotLength; i++) {
        const node = result.snapshotItem(i);
        if (node.nodeType === Node.ELEMENT_NODE) {
            node.setAttribute(__ANCHOR__, __TOKEN__);
            marked++;
        }
    }
    return marked;
})()"#;

const MARK_ANCESTOR_JS: &str = r#"function() {
    const name = __ATTRIBUTE__;
    let node = this.parentElement;
    for (let depth = 0; node && depth < __DEPTH__; depth++) {
        if (node.getAttribute(name)) {
            node.setAttribute(__ANCHOR__, __TOKEN__);
            return true;
        }
        node = node.parentElement;
    }
    return false;
}"#;

pub struct ChromeSurface {
    page: Page,
    anchors: AtomicUsize,
}

impl ChromeSurface {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            anchors: AtomicUsize::new(0),
        }
    }

    fn wrap(elements: Vec<Element>) -> Vec<UIElement> {
        elements
            .into_iter()
            .map(|element| {
                UIElement::new(Box::new(ChromeElement {
                    element: Arc::new(element),
                }))
            })
            .collect()
    }

    fn next_token(&self) -> String {
        format!("a{}", self.anchors.fetch_add(1, Ordering::Relaxed))
    }

    /// XPath matches are marked in the page and then resolved by CSS, so no
    /// DOM search session is opened and zero matches is an empty result.
    async fn find_xpath(&self, xpath: &str) -> Result<Vec<UIElement>, AutomationError> {
        let token = self.next_token();
        let marked = self
            .page
            .evaluate_expression(mark_xpath_script(xpath, &token))
            .await
            .map_err(map_cdp_error)?
            .value()
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if marked == 0 {
            return Ok(Vec::new());
        }
        let elements = self
            .page
            .find_elements(anchor_css(&token))
            .await
            .map_err(map_cdp_error)?;
        Ok(Self::wrap(elements))
    }

    async fn dispatch_key(
        &self,
        event: DispatchKeyEventType,
        key: &str,
        code: i64,
    ) -> Result<(), AutomationError> {
        let params = DispatchKeyEventParams::builder()
            .r#type(event)
            .key(key)
            .code(key)
            .windows_virtual_key_code(code)
            .build()
            .map_err(|e| AutomationError::Internal(format!("Failed to build key event: {e}")))?;
        self.page.execute(params).await.map_err(map_cdp_error)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Surface for ChromeSurface {
    async fn find_all(&self, selector: &Selector) -> Result<Vec<UIElement>, AutomationError> {
        match selector {
            Selector::Css(css) => {
                let elements = self
                    .page
                    .find_elements(css.as_str())
                    .await
                    .map_err(map_cdp_error)?;
                Ok(Self::wrap(elements))
            }
            Selector::XPath(xpath) => self.find_xpath(xpath).await,
            Selector::Invalid(reason) => Err(AutomationError::InvalidSelector(reason.clone())),
        }
    }

    async fn find_nearest_ancestor_with_attribute(
        &self,
        element: &UIElement,
        attribute: &str,
        max_depth: usize,
    ) -> Result<Option<UIElement>, AutomationError> {
        let token = self.next_token();
        let function = MARK_ANCESTOR_JS
            .replace("__ATTRIBUTE__", &js_string(attribute))
            .replace("__DEPTH__", &max_depth.to_string())
            .replace("__ANCHOR__", &js_string(ANCHOR_ATTRIBUTE))
            .replace("__TOKEN__", &js_string(&token));

        let chrome = chrome_element(element)?;
        if !as_bool(chrome.eval(function).await?) {
            return Ok(None);
        }

        let marked = self
            .page
            .find_elements(anchor_css(&token))
            .await
            .map_err(map_cdp_error)?;
        Ok(Self::wrap(marked).into_iter().next())
    }

    async fn send_cancel_key(&self) -> Result<(), AutomationError> {
        debug!("Sending Escape");
        self.dispatch_key(DispatchKeyEventType::KeyDown, "Escape", 27)
            .await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, "Escape", 27)
            .await
    }
}

#[derive(Clone)]
struct ChromeElement {
    element: Arc<Element>,
}

impl fmt::Debug for ChromeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromeElement")
            .field("remote_object", &self.element.remote_object_id)
            .finish()
    }
}

impl ChromeElement {
    async fn eval(&self, function: impl Into<String>) -> Result<Option<Value>, AutomationError> {
        let returns = self
            .element
            .call_js_fn(function, false)
            .await
            .map_err(map_cdp_error)?;
        if let Some(details) = returns.exception_details {
            return Err(AutomationError::PlatformError(format!(
                "Script threw: {}",
                details.text
            )));
        }
        Ok(returns.result.value)
    }
}

#[async_trait::async_trait]
impl UIElementImpl for ChromeElement {
    async fn is_visible(&self) -> Result<bool, AutomationError> {
        Ok(as_bool(self.eval(IS_VISIBLE_JS).await?))
    }

    async fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(as_bool(self.eval(IS_ENABLED_JS).await?))
    }

    async fn is_attached(&self) -> Result<bool, AutomationError> {
        match self.eval(IS_ATTACHED_JS).await {
            Ok(value) => Ok(as_bool(value)),
            // The remote object is released once its node is gone
            Err(AutomationError::ElementDetached(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.eval(SCROLL_INTO_VIEW_JS).await?;
        Ok(())
    }

    async fn click(&self) -> Result<(), AutomationError> {
        if !as_bool(self.eval(HIT_TEST_JS).await?) {
            return Err(AutomationError::ElementObscured(
                "Click target is covered at its centre".to_string(),
            ));
        }
        self.element.click().await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn click_synthetic(&self) -> Result<(), AutomationError> {
        self.eval(SYNTHETIC_CLICK_JS).await?;
        Ok(())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        self.element.attribute(name).await.map_err(map_cdp_error)
    }

    async fn value(&self) -> Result<String, AutomationError> {
        let value = self
            .element
            .property("value")
            .await
            .map_err(map_cdp_error)?;
        Ok(match value {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
    }

    async fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        let function = SET_VALUE_JS.replace("__VALUE__", &js_string(value));
        self.eval(function).await?;
        Ok(())
    }

    async fn dispatch_change_notifications(&self) -> Result<(), AutomationError> {
        self.eval(DISPATCH_CHANGE_JS).await?;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(self.clone())
    }
}

fn chrome_element(element: &UIElement) -> Result<ChromeElement, AutomationError> {
    element
        .downcast_ref::<ChromeElement>()
        .cloned()
        .ok_or_else(|| {
            AutomationError::Internal("Element does not belong to a Chrome surface".to_string())
        })
}

fn mark_xpath_script(xpath: &str, token: &str) -> String {
    MARK_XPATH_JS
        .replace("__XPATH__", &js_string(xpath))
        .replace("__ANCHOR__", &js_string(ANCHOR_ATTRIBUTE))
        .replace("__TOKEN__", &js_string(token))
}

fn anchor_css(token: &str) -> String {
    format!("[{ANCHOR_ATTRIBUTE}=\"{token}\"]")
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn as_bool(value: Option<Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

fn map_cdp_error(e: chromiumoxide::error::CdpError) -> AutomationError {
    let message = e.to_string();
    let lower = message.to_lowercase();
    if lower.contains("could not find node")
        || lower.contains("no node with given id")
        || lower.contains("could not find object")
        || lower.contains("cannot find context")
    {
        AutomationError::ElementDetached(message)
    } else {
        AutomationError::PlatformError(message)
    }
}
