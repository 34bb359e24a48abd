//! Display binding
//!
//! [`DisplayBinder::bind`] drives one element through resolution, fetch and
//! application. Every failure leaves the element as it was, unloaded, so a
//! later pass can try again. Application happens in a single tree edit that
//! re-checks the loaded flag, so two binds racing on one element apply once.

use std::sync::Arc;

use swarmview_cache::{FetchCoordinator, LocatorResolver, MaterializedResource};
use swarmview_core::{MediaError, MediaId, MimeClass};
use tracing::{debug, info, instrument, warn};

use crate::element::{Element, ElementId, ElementKind, Node, attr};
use crate::error::{DisplayError, DisplayResult};
use crate::tree::{DisplayTree, TreeTxn};

/// Result of one bind attempt
#[derive(Debug, Clone)]
pub enum BindOutcome {
    /// Element was already bound; nothing done
    AlreadyLoaded,
    /// Element requests no media
    NoMediaId,
    /// Ledger has no locator for the media id
    NotFound,
    /// Fetch or materialization failed
    Failed(MediaError),
    /// Element left the tree before the resource could be applied
    Detached,
    /// Resource fetched but the tree edit applying it was rejected
    ApplyFailed(DisplayError),
    /// Resource applied; `element` is the element now displaying it
    Bound {
        element: ElementId,
        resource: Arc<MaterializedResource>,
    },
}

impl BindOutcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, BindOutcome::Bound { .. })
    }
}

/// Binds display elements to materialized media
#[derive(Debug, Clone)]
pub struct DisplayBinder {
    tree: Arc<DisplayTree>,
    resolver: LocatorResolver,
    coordinator: FetchCoordinator,
}

impl DisplayBinder {
    pub fn new(
        tree: Arc<DisplayTree>,
        resolver: LocatorResolver,
        coordinator: FetchCoordinator,
    ) -> Self {
        Self {
            tree,
            resolver,
            coordinator,
        }
    }

    pub fn tree(&self) -> &Arc<DisplayTree> {
        &self.tree
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    /// Resolve, fetch and apply media for one element
    #[instrument(skip(self, id), fields(element = %id))]
    pub async fn bind(&self, id: ElementId) -> BindOutcome {
        let Some(node) = self.tree.get(id) else {
            return BindOutcome::Detached;
        };
        if node.is_loaded() {
            return BindOutcome::AlreadyLoaded;
        }
        let Some(media) = node.media_id() else {
            return BindOutcome::NoMediaId;
        };

        let locator = match self.resolver.resolve(&media).await {
            Ok(locator) => locator,
            Err(e) => {
                debug!(media = %media, error = %e, "Media not resolved, leaving placeholder");
                return BindOutcome::NotFound;
            }
        };

        let resource = match self.coordinator.fetch(&locator).await {
            Ok(resource) => resource,
            Err(e) => {
                warn!(media = %media, error = %e, "Media fetch failed, leaving placeholder");
                return BindOutcome::Failed(e);
            }
        };

        self.apply(id, &media, resource)
    }

    /// Apply a resource to an element in one tree edit
    fn apply(
        &self,
        id: ElementId,
        media: &MediaId,
        resource: Arc<MaterializedResource>,
    ) -> BindOutcome {
        let applied = self.tree.edit(|txn| -> DisplayResult<Option<BindOutcome>> {
            let Some(node) = txn.get(id).cloned() else {
                return Ok(None);
            };
            if node.is_loaded() {
                return Ok(Some(BindOutcome::AlreadyLoaded));
            }
            let element = match resource.mime_class {
                MimeClass::Image | MimeClass::Unknown => apply_source(txn, &node, &resource)?,
                MimeClass::Pdf => apply_document(txn, &node, &resource)?,
                MimeClass::Video => apply_video(txn, &node, &resource)?,
            };
            Ok(Some(BindOutcome::Bound {
                element,
                resource: Arc::clone(&resource),
            }))
        });

        match applied {
            Ok(Some(outcome)) => {
                if let BindOutcome::Bound { element, .. } = &outcome {
                    info!(
                        media = %media,
                        class = %resource.mime_class,
                        element = %element,
                        handle = %resource.handle,
                        "Bound media"
                    );
                }
                outcome
            }
            Ok(None) => {
                debug!(media = %media, "Element removed before binding");
                BindOutcome::Detached
            }
            Err(e) => {
                warn!(media = %media, error = %e, "Could not apply media");
                BindOutcome::ApplyFailed(e)
            }
        }
    }
}

/// Attributes the bound element keeps from its placeholder
fn carried_attrs(node: &Node, kind: ElementKind) -> Element {
    node.attrs
        .iter()
        .filter(|(name, _)| name.as_str() != attr::SRC)
        .fold(Element::new(kind), |el, (name, value)| {
            el.with_attr(name.clone(), value.clone())
        })
}

fn apply_source(
    txn: &mut TreeTxn<'_>,
    node: &Node,
    resource: &MaterializedResource,
) -> DisplayResult<ElementId> {
    txn.set_attr(node.id, attr::SRC, resource.url())?;
    txn.set_attr(node.id, attr::LOADED, "true")?;
    Ok(node.id)
}

fn apply_document(
    txn: &mut TreeTxn<'_>,
    node: &Node,
    resource: &MaterializedResource,
) -> DisplayResult<ElementId> {
    let element = if node.kind == ElementKind::Embed {
        apply_source(txn, node, resource)?
    } else {
        let embed = carried_attrs(node, ElementKind::Embed)
            .with_attr(attr::SRC, resource.url())
            .with_attr(attr::TYPE, "application/pdf")
            .with_attr(attr::WIDTH, "100%")
            .with_attr(attr::HEIGHT, "100%")
            .with_attr(attr::LOADED, "true");
        txn.replace(node.id, embed)?
    };

    if node.is_downloadable() {
        let link = Element::new(ElementKind::Anchor)
            .with_attr(attr::HREF, resource.url())
            .with_attr(attr::DOWNLOAD, resource.file_name.clone());
        txn.insert_after(element, link)?;
    }
    Ok(element)
}

fn apply_video(
    txn: &mut TreeTxn<'_>,
    node: &Node,
    resource: &MaterializedResource,
) -> DisplayResult<ElementId> {
    if node.kind == ElementKind::Video {
        txn.set_attr(node.id, attr::CONTROLS, "true")?;
        txn.set_attr(node.id, attr::AUTOPLAY, "true")?;
        return apply_source(txn, node, resource);
    }

    let video = carried_attrs(node, ElementKind::Video)
        .with_attr(attr::SRC, resource.url())
        .with_attr(attr::TYPE, resource.mime_type.clone())
        .with_attr(attr::CONTROLS, "true")
        .with_attr(attr::AUTOPLAY, "true")
        .with_attr(attr::LOADED, "true");
    txn.replace(node.id, video)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmview_cache::CacheConfig;
    use swarmview_core::{MockFile, MockLedger, MockSwarm};

    const AAA: &str = "magnet:?xt=urn:btih:AAA";

    fn binder(ledger: MockLedger, swarm: Arc<MockSwarm>) -> DisplayBinder {
        DisplayBinder::new(
            Arc::new(DisplayTree::new()),
            LocatorResolver::new(Arc::new(ledger)),
            FetchCoordinator::new(CacheConfig::default(), swarm),
        )
    }

    #[tokio::test]
    async fn test_bind_image_sets_source() {
        let swarm = Arc::new(MockSwarm::new());
        swarm.seed(AAA, MockFile::new("7.png", b"png".to_vec()));
        let binder = binder(MockLedger::new().with_media("7.png", AAA), swarm);
        let tree = binder.tree().clone();
        let id = tree.append(tree.root(), Element::image("7.png")).unwrap();

        let outcome = binder.bind(id).await;
        let BindOutcome::Bound { element, resource } = outcome else {
            panic!("expected bound, got {outcome:?}");
        };
        assert_eq!(element, id);
        assert_eq!(tree.attr(id, attr::SRC).as_deref(), Some(resource.url()));
        assert_eq!(tree.attr(id, attr::LOADED).as_deref(), Some("true"));

        assert!(matches!(binder.bind(id).await, BindOutcome::AlreadyLoaded));
    }

    #[tokio::test]
    async fn test_bind_without_media_id() {
        let binder = binder(MockLedger::new(), Arc::new(MockSwarm::new()));
        let tree = binder.tree().clone();
        let id = tree.append(tree.root(), Element::container()).unwrap();

        assert!(matches!(binder.bind(id).await, BindOutcome::NoMediaId));
        tree.remove(id).unwrap();
        assert!(matches!(binder.bind(id).await, BindOutcome::Detached));
    }

    #[tokio::test]
    async fn test_rejected_edit_is_reported() {
        let swarm = Arc::new(MockSwarm::new());
        swarm.seed(AAA, MockFile::new("paper.pdf", b"%PDF-1.7".to_vec()));
        let binder = binder(MockLedger::new().with_media("paper.pdf", AAA), swarm);
        let tree = binder.tree().clone();
        let root = tree.root();
        tree.set_attr(root, attr::MEDIA_ID, "paper.pdf").unwrap();

        // A document replaces its placeholder, and the root has no parent
        let outcome = binder.bind(root).await;
        assert!(
            matches!(outcome, BindOutcome::ApplyFailed(DisplayError::RootElement)),
            "got {outcome:?}"
        );
        assert!(!tree.get(root).unwrap().is_loaded());
    }

    #[tokio::test]
    async fn test_bind_video_replaces_placeholder() {
        let swarm = Arc::new(MockSwarm::new());
        swarm.seed(AAA, MockFile::new("clip.mp4", b"mp4".to_vec()));
        let binder = binder(MockLedger::new().with_video("3", AAA), swarm);
        let tree = binder.tree().clone();
        let placeholder = tree
            .append(
                tree.root(),
                Element::new(ElementKind::Image).with_attr(attr::VIDEO_ID, "3"),
            )
            .unwrap();

        let BindOutcome::Bound { element, .. } = binder.bind(placeholder).await else {
            panic!("expected bound");
        };
        let node = tree.get(element).unwrap();
        assert_eq!(node.kind, ElementKind::Video);
        assert_eq!(node.attr(attr::CONTROLS), Some("true"));
        assert_eq!(node.attr(attr::AUTOPLAY), Some("true"));
        assert_eq!(node.attr(attr::TYPE), Some("video/mp4"));
        assert_eq!(node.attr(attr::VIDEO_ID), Some("3"));
        assert!(!tree.contains(placeholder));
    }
}
