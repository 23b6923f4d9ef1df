//! DomDriver - Abstract Browser Surface
//!
//! The resolution engine and the scenario runner only talk to the page
//! through [`DomDriver`]. The CDP adapter in `browser` implements it for a
//! real Chromium page; [`MockDriver`] implements it over an in-memory DOM so
//! every wait path can be exercised without a browser.

use crate::result::{FormprobeError, FormprobeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Offset inside an element's border box, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Abstract page surface consumed by the wait engine and the runner
///
/// Handles are opaque references to live nodes (elements, shadow roots or
/// the document itself). Queries are scoped to a handle and never cross a
/// shadow boundary on their own.
#[async_trait]
pub trait DomDriver: Send + Sync {
    /// Reference to a live node
    type Handle: Clone + Send + Sync + fmt::Debug;

    /// The document root used as the first query scope
    async fn document(&self) -> FormprobeResult<Self::Handle>;

    /// All matches of `selector` under `scope`, in document order
    async fn query_selector_all(
        &self,
        scope: &Self::Handle,
        selector: &str,
    ) -> FormprobeResult<Vec<Self::Handle>>;

    /// Open shadow root of `element`, if it has one
    async fn shadow_root(&self, element: &Self::Handle) -> FormprobeResult<Option<Self::Handle>>;

    /// `element.isConnected`
    async fn is_connected(&self, element: &Self::Handle) -> FormprobeResult<bool>;

    /// Element has a non-empty box and is not `visibility: hidden`
    async fn is_visible(&self, element: &Self::Handle) -> FormprobeResult<bool>;

    /// Element box intersects the viewport (threshold zero)
    async fn is_intersecting_viewport(&self, element: &Self::Handle) -> FormprobeResult<bool>;

    /// Scroll element to the viewport centre on both axes, without animation
    async fn scroll_into_view(&self, element: &Self::Handle) -> FormprobeResult<()>;

    /// `element.textContent`
    async fn text_content(&self, element: &Self::Handle) -> FormprobeResult<Option<String>>;

    /// Click at `offset` inside the element (centre when `None`)
    async fn click(&self, element: &Self::Handle, offset: Option<Point>) -> FormprobeResult<()>;

    /// Focus the element and type `text` key by key
    async fn type_text(&self, element: &Self::Handle, text: &str) -> FormprobeResult<()>;

    /// Press a key without releasing it
    async fn key_down(&self, key: &str) -> FormprobeResult<()>;

    /// Release a key
    async fn key_up(&self, key: &str) -> FormprobeResult<()>;

    /// Resize the viewport
    async fn set_viewport(&self, width: u32, height: u32) -> FormprobeResult<()>;

    /// Navigate and wait for the navigation to complete
    async fn navigate(&self, url: &str) -> FormprobeResult<()>;

    /// Capture the viewport as PNG bytes
    async fn screenshot(&self) -> FormprobeResult<Vec<u8>>;
}

// ============================================================================
// In-memory DOM
// ============================================================================

/// Identifier of a node in a [`MockDriver`] document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the in-memory DOM
#[derive(Debug, Clone)]
pub struct MockNode {
    /// Tag name
    pub tag: String,
    /// Selectors this node answers to (matched literally)
    pub matches: Vec<String>,
    /// `textContent`
    pub text: Option<String>,
    /// Input value accumulated by typing
    pub value: String,
    /// Light-DOM children
    pub children: Vec<NodeId>,
    /// Attached shadow root
    pub shadow_root: Option<NodeId>,
    /// `isConnected`
    pub connected: bool,
    /// Rendered with a non-empty box
    pub visible: bool,
    /// Currently inside the viewport
    pub in_viewport: bool,
    /// Whether scrolling brings it into the viewport
    pub scrollable: bool,
    /// Queries that must run before this node starts matching
    pub appears_after: u32,
}

impl MockNode {
    /// A connected, visible, on-screen node
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            matches: Vec::new(),
            text: None,
            value: String::new(),
            children: Vec::new(),
            shadow_root: None,
            connected: true,
            visible: true,
            in_viewport: true,
            scrollable: true,
            appears_after: 0,
        }
    }

    /// Add a selector this node answers to
    #[must_use]
    pub fn matching(mut self, selector: impl Into<String>) -> Self {
        self.matches.push(selector.into());
        self
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Place the node outside the viewport
    #[must_use]
    pub const fn offscreen(mut self) -> Self {
        self.in_viewport = false;
        self
    }

    /// Keep the node outside the viewport even after scrolling
    #[must_use]
    pub const fn unscrollable(mut self) -> Self {
        self.in_viewport = false;
        self.scrollable = false;
        self
    }

    /// Render the node with an empty box
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Start detached from the document
    #[must_use]
    pub const fn detached(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Only start matching after `queries` query calls
    #[must_use]
    pub const fn appears_after(mut self, queries: u32) -> Self {
        self.appears_after = queries;
        self
    }
}

/// Handler run when a node is clicked
pub type ClickHandler = Arc<dyn Fn(&mut MockDom) + Send + Sync>;

/// State behind a [`MockDriver`]
#[derive(Debug, Clone)]
pub struct MockDom {
    nodes: Vec<MockNode>,
    query_count: u32,
    /// Call history for verification
    pub call_history: Vec<String>,
    /// Current URL
    pub current_url: String,
    /// Current viewport
    pub viewport: (u32, u32),
}

impl MockDom {
    fn new() -> Self {
        Self {
            nodes: vec![MockNode::new("#document")],
            query_count: 0,
            call_history: Vec::new(),
            current_url: String::from("about:blank"),
            viewport: (800, 600),
        }
    }

    /// Borrow a node
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this document
    #[must_use]
    pub fn node(&self, id: NodeId) -> &MockNode {
        &self.nodes[id.0]
    }

    /// Mutably borrow a node
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this document
    pub fn node_mut(&mut self, id: NodeId) -> &mut MockNode {
        &mut self.nodes[id.0]
    }

    fn get(&self, id: NodeId) -> FormprobeResult<&MockNode> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| FormprobeError::page(format!("no node {id}")))
    }

    fn get_mut(&mut self, id: NodeId) -> FormprobeResult<&mut MockNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| FormprobeError::page(format!("no node {id}")))
    }

    fn push(&mut self, node: MockNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn collect_matches(&self, scope: NodeId, selector: &str, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[scope.0].children {
            let node = &self.nodes[child.0];
            if node.matches.iter().any(|m| m == selector) && self.query_count > node.appears_after
            {
                out.push(child);
            }
            self.collect_matches(child, selector, out);
        }
    }
}

/// Mock driver for unit testing
///
/// Node `0` is the document. Queries walk light-DOM descendants only, so a
/// chain must enter shadow roots explicitly, as it would in a browser.
#[derive(Clone)]
pub struct MockDriver {
    dom: Arc<Mutex<MockDom>>,
    click_handlers: Arc<Mutex<HashMap<NodeId, ClickHandler>>>,
}

impl fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDriver")
            .field("dom", &self.dom)
            .finish_non_exhaustive()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// The document node
    pub const DOCUMENT: NodeId = NodeId(0);

    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self {
            dom: Arc::new(Mutex::new(MockDom::new())),
            click_handlers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lock the underlying document
    pub fn dom(&self) -> MutexGuard<'_, MockDom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `node` as a light-DOM child of `parent`
    pub fn append(&self, parent: NodeId, node: MockNode) -> NodeId {
        let mut dom = self.dom();
        let id = dom.push(node);
        dom.node_mut(parent).children.push(id);
        id
    }

    /// Attach an open shadow root to `host`
    pub fn attach_shadow(&self, host: NodeId) -> NodeId {
        let mut dom = self.dom();
        let root = dom.push(MockNode::new("#shadow-root"));
        dom.node_mut(host).shadow_root = Some(root);
        root
    }

    /// Run `handler` whenever `node` is clicked
    pub fn on_click<F>(&self, node: NodeId, handler: F)
    where
        F: Fn(&mut MockDom) + Send + Sync + 'static,
    {
        self.click_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node, Arc::new(handler));
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.dom().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.dom().call_history.iter().any(|c| c.starts_with(method))
    }

    /// Number of history entries starting with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.dom()
            .call_history
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }

    fn record(&self, call: String) {
        self.dom().call_history.push(call);
    }
}

#[async_trait]
impl DomDriver for MockDriver {
    type Handle = NodeId;

    async fn document(&self) -> FormprobeResult<NodeId> {
        Ok(Self::DOCUMENT)
    }

    async fn query_selector_all(
        &self,
        scope: &NodeId,
        selector: &str,
    ) -> FormprobeResult<Vec<NodeId>> {
        let mut dom = self.dom();
        dom.get(*scope)?;
        dom.query_count += 1;
        dom.call_history.push(format!("query:{scope}:{selector}"));
        let mut found = Vec::new();
        dom.collect_matches(*scope, selector, &mut found);
        Ok(found)
    }

    async fn shadow_root(&self, element: &NodeId) -> FormprobeResult<Option<NodeId>> {
        let mut dom = self.dom();
        dom.call_history.push(format!("shadow_root:{element}"));
        Ok(dom.get(*element)?.shadow_root)
    }

    async fn is_connected(&self, element: &NodeId) -> FormprobeResult<bool> {
        Ok(self.dom().get(*element)?.connected)
    }

    async fn is_visible(&self, element: &NodeId) -> FormprobeResult<bool> {
        let dom = self.dom();
        let node = dom.get(*element)?;
        Ok(node.connected && node.visible)
    }

    async fn is_intersecting_viewport(&self, element: &NodeId) -> FormprobeResult<bool> {
        Ok(self.dom().get(*element)?.in_viewport)
    }

    async fn scroll_into_view(&self, element: &NodeId) -> FormprobeResult<()> {
        let mut dom = self.dom();
        dom.call_history.push(format!("scroll:{element}"));
        let node = dom.get_mut(*element)?;
        if node.scrollable {
            node.in_viewport = true;
        }
        Ok(())
    }

    async fn text_content(&self, element: &NodeId) -> FormprobeResult<Option<String>> {
        Ok(self.dom().get(*element)?.text.clone())
    }

    async fn click(&self, element: &NodeId, offset: Option<Point>) -> FormprobeResult<()> {
        let handler = {
            let mut dom = self.dom();
            dom.get(*element)?;
            let at = offset.map_or_else(|| "center".to_string(), |p| format!("{},{}", p.x, p.y));
            dom.call_history.push(format!("click:{element}@{at}"));
            self.click_handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(element)
                .cloned()
        };
        if let Some(handler) = handler {
            handler(&mut *self.dom());
        }
        Ok(())
    }

    async fn type_text(&self, element: &NodeId, text: &str) -> FormprobeResult<()> {
        let mut dom = self.dom();
        dom.call_history.push(format!("type:{element}:{text}"));
        dom.get_mut(*element)?.value.push_str(text);
        Ok(())
    }

    async fn key_down(&self, key: &str) -> FormprobeResult<()> {
        self.record(format!("key_down:{key}"));
        Ok(())
    }

    async fn key_up(&self, key: &str) -> FormprobeResult<()> {
        self.record(format!("key_up:{key}"));
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> FormprobeResult<()> {
        let mut dom = self.dom();
        dom.call_history.push(format!("set_viewport:{width}x{height}"));
        dom.viewport = (width, height);
        Ok(())
    }

    async fn navigate(&self, url: &str) -> FormprobeResult<()> {
        let mut dom = self.dom();
        dom.call_history.push(format!("navigate:{url}"));
        dom.current_url = url.to_string();
        Ok(())
    }

    async fn screenshot(&self) -> FormprobeResult<Vec<u8>> {
        self.record("screenshot".to_string());
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod mock_dom_tests {
        use super::*;

        #[tokio::test]
        async fn test_query_finds_light_descendants() {
            let driver = MockDriver::new();
            let form = driver.append(MockDriver::DOCUMENT, MockNode::new("form"));
            let input = driver.append(form, MockNode::new("input").matching("#email"));

            let found = driver
                .query_selector_all(&MockDriver::DOCUMENT, "#email")
                .await
                .unwrap();
            assert_eq!(found, vec![input]);
        }

        #[tokio::test]
        async fn test_query_does_not_enter_shadow_roots() {
            let driver = MockDriver::new();
            let host = driver.append(MockDriver::DOCUMENT, MockNode::new("x-host"));
            let root = driver.attach_shadow(host);
            let inner = driver.append(root, MockNode::new("input").matching("input"));

            let from_doc = driver
                .query_selector_all(&MockDriver::DOCUMENT, "input")
                .await
                .unwrap();
            assert!(from_doc.is_empty());

            let from_root = driver.query_selector_all(&root, "input").await.unwrap();
            assert_eq!(from_root, vec![inner]);
            assert_eq!(driver.shadow_root(&host).await.unwrap(), Some(root));
        }

        #[tokio::test]
        async fn test_appears_after_queries() {
            let driver = MockDriver::new();
            driver.append(
                MockDriver::DOCUMENT,
                MockNode::new("p").matching("p").appears_after(2),
            );

            for expected in [0, 0, 1] {
                let found = driver
                    .query_selector_all(&MockDriver::DOCUMENT, "p")
                    .await
                    .unwrap();
                assert_eq!(found.len(), expected);
            }
        }

        #[tokio::test]
        async fn test_scroll_respects_scrollable() {
            let driver = MockDriver::new();
            let a = driver.append(MockDriver::DOCUMENT, MockNode::new("a").offscreen());
            let b = driver.append(MockDriver::DOCUMENT, MockNode::new("b").unscrollable());

            driver.scroll_into_view(&a).await.unwrap();
            driver.scroll_into_view(&b).await.unwrap();

            assert!(driver.is_intersecting_viewport(&a).await.unwrap());
            assert!(!driver.is_intersecting_viewport(&b).await.unwrap());
            assert_eq!(driver.call_count("scroll:"), 2);
        }

        #[tokio::test]
        async fn test_click_runs_handler() {
            let driver = MockDriver::new();
            let button = driver.append(MockDriver::DOCUMENT, MockNode::new("button"));
            let msg = driver.append(MockDriver::DOCUMENT, MockNode::new("p"));
            driver.on_click(button, move |dom| {
                dom.node_mut(msg).text = Some("clicked".into());
            });

            driver
                .click(&button, Some(Point::new(1.5, 2.0)))
                .await
                .unwrap();

            assert_eq!(
                driver.text_content(&msg).await.unwrap().as_deref(),
                Some("clicked")
            );
            assert!(driver.was_called("click:#1@1.5,2"));
        }

        #[tokio::test]
        async fn test_type_accumulates_value() {
            let driver = MockDriver::new();
            let input = driver.append(MockDriver::DOCUMENT, MockNode::new("input"));
            driver.type_text(&input, "an").await.unwrap();
            driver.type_text(&input, "na").await.unwrap();
            assert_eq!(driver.dom().node(input).value, "anna");
        }

        #[tokio::test]
        async fn test_unknown_node_is_page_error() {
            let driver = MockDriver::new();
            let err = driver.is_connected(&NodeId(42)).await.unwrap_err();
            assert!(err.to_string().contains("no node #42"));
        }

        #[tokio::test]
        async fn test_navigation_and_viewport_recorded() {
            let driver = MockDriver::new();
            driver.set_viewport(1167, 980).await.unwrap();
            driver.navigate("http://127.0.0.1:5500/").await.unwrap();
            let dom = driver.dom();
            assert_eq!(dom.viewport, (1167, 980));
            assert_eq!(dom.current_url, "http://127.0.0.1:5500/");
        }
    }
}
