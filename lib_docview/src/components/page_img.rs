//! # Page Image View
//!
//! Displays the raster image of one page. The image source comes from the
//! `page-img` data provider; the drawing itself is delegated to a
//! [`PageSurface`] supplied by the embedder through [`PageImg::init`].
//!
//! `load` is shared until `unload`: repeated calls return the same future.
//! `unload` aborts a pending load. On touch-oriented platforms it also removes
//! the image so the next `load` fetches again; elsewhere the image is hidden
//! and the next `load` shows it again without a request. Failed loads are
//! reported as an `asseterror` broadcast carrying the error payload.

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::core::component::{AssetLoader, Component, Destroyable};
use crate::core::future::AbortableFuture;
use crate::core::scope::Scope;
use crate::error::FrameworkError;
use crate::utils::browser::{BrowserInfo, BROWSER_UTILITY};

/// Component and data-provider name.
pub const PAGE_IMG: &str = "page-img";
/// Message broadcast when an asset fails to load.
pub const ASSET_ERROR: &str = "asseterror";

/// Where a page view draws. Implemented by the display layer.
pub trait PageSurface: Send + Sync {
    /// Appends an image element for `src`.
    fn insert_image(&self, src: &str);
    /// Makes a hidden image visible again.
    fn show_image(&self);
    /// Hides the image, keeping it in place.
    fn hide_image(&self);
    /// Removes the image element.
    fn remove_image(&self);
    /// Removes everything the view put on the surface.
    fn clear(&self);
}

#[derive(Default)]
struct State {
    surface: Option<Arc<dyn PageSurface>>,
    page: u32,
    loading: Option<AbortableFuture<()>>,
    image: Option<String>,
    /// Bumped by `unload` so a late result of an older load is dropped.
    generation: u64,
}

/// The `page-img` component.
pub struct PageImg {
    scope: Scope,
    remove_on_unload: bool,
    state: Arc<Mutex<State>>,
}

impl PageImg {
    /// Builds the view for `scope`.
    pub fn new(scope: &Scope) -> Result<Self, FrameworkError> {
        let browser = scope.get_utility::<BrowserInfo>(BROWSER_UTILITY)?;
        Ok(Self {
            scope: scope.clone(),
            remove_on_unload: browser.mobile,
            state: Arc::new(Mutex::new(State::default())),
        })
    }

    /// Binds the view to its surface and page.
    pub fn init(&self, surface: Arc<dyn PageSurface>, page: u32) {
        let mut state = self.lock();
        state.surface = Some(surface);
        state.page = page;
    }

    /// The page this view shows.
    pub fn page(&self) -> u32 {
        self.lock().page
    }

    /// The source of the image currently on the surface, shown or hidden.
    pub fn image_src(&self) -> Option<String> {
        self.lock().image.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("PageImg lock poisoned")
    }
}

impl AssetLoader for PageImg {
    fn preload(&self) {}

    fn load(&self) -> AbortableFuture<()> {
        let mut state = self.lock();
        if let Some(loading) = &state.loading {
            return loading.clone();
        }

        let Some(surface) = state.surface.clone() else {
            log::warn!("page-img loaded before init; nothing to draw on");
            return AbortableFuture::resolved(());
        };

        if state.image.is_some() {
            surface.show_image();
            let shown = AbortableFuture::resolved(());
            state.loading = Some(shown.clone());
            return shown;
        }

        let generation = state.generation;
        let slot = Arc::clone(&self.state);
        let scope = self.scope.clone();
        let loading = self.scope.get(PAGE_IMG, state.page).chain(move |outcome| match outcome {
            Ok(src) => {
                let mut state = slot.lock().expect("PageImg lock poisoned");
                if state.generation == generation {
                    if let Some(src) = src {
                        surface.insert_image(&src);
                        state.image = Some(src);
                    }
                }
                Ok(())
            }
            Err(error) => {
                if !error.is_aborted() {
                    scope.broadcast(ASSET_ERROR, error.to_payload());
                }
                Err(error)
            }
        });
        state.loading = Some(loading.clone());
        loading
    }

    fn unload(&self) {
        let (loading, surface, had_image) = {
            let mut state = self.lock();
            state.generation += 1;
            let had_image = state.image.is_some();
            if had_image && self.remove_on_unload {
                state.image = None;
            }
            (state.loading.take(), state.surface.clone(), had_image)
        };

        if let Some(loading) = loading {
            loading.abort();
        }
        if let (Some(surface), true) = (surface, had_image) {
            if self.remove_on_unload {
                surface.remove_image();
            } else {
                surface.hide_image();
            }
        }
    }
}

impl Destroyable for PageImg {
    fn destroy(&self) {
        let (loading, surface) = {
            let mut state = self.lock();
            state.generation += 1;
            state.image = None;
            (state.loading.take(), state.surface.take())
        };
        if let Some(loading) = loading {
            loading.abort();
        }
        if let Some(surface) = surface {
            surface.clear();
        }
    }
}

impl Component for PageImg {
    fn as_destroyable(&self) -> Option<&dyn Destroyable> {
        Some(self)
    }

    fn as_asset_loader(&self) -> Option<&dyn AssetLoader> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::ViewerConfig;
    use crate::core::component::{AssetFuture, DataProvider, Locator, MessageListener};
    use crate::core::registry::Framework;
    use crate::error::AssetError;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Surface {
        ops: Mutex<Vec<String>>,
    }

    impl Surface {
        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    impl PageSurface for Surface {
        fn insert_image(&self, src: &str) {
            self.ops.lock().unwrap().push(format!("insert {src}"));
        }
        fn show_image(&self) {
            self.ops.lock().unwrap().push("show".into());
        }
        fn hide_image(&self) {
            self.ops.lock().unwrap().push("hide".into());
        }
        fn remove_image(&self) {
            self.ops.lock().unwrap().push("remove".into());
        }
        fn clear(&self) {
            self.ops.lock().unwrap().push("clear".into());
        }
    }

    /// Resolves `page-N.png`, fails, or never settles.
    struct Images {
        calls: Arc<AtomicUsize>,
        fail: bool,
        hang: bool,
    }

    impl DataProvider for Images {
        fn get(&self, _model_name: &str, locator: &Locator) -> AssetFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                return AbortableFuture::pending().1;
            }
            if self.fail {
                return AbortableFuture::rejected(AssetError::TransportFailure {
                    status: 404,
                    status_text: "Not Found".into(),
                    resource: "page.png".into(),
                });
            }
            let Locator::Page(page) = locator else { unreachable!() };
            AbortableFuture::resolved(Some(format!("page-{page}.png")))
        }
    }

    #[derive(Default)]
    struct ErrorSink {
        received: Mutex<Vec<Value>>,
    }

    impl MessageListener for ErrorSink {
        fn messages(&self) -> &[&'static str] {
            &[ASSET_ERROR]
        }
        fn on_message(&self, _message: &str, data: &Value) {
            self.received.lock().unwrap().push(data.clone());
        }
    }

    impl Component for ErrorSink {
        fn as_listener(&self) -> Option<&dyn MessageListener> {
            Some(self)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn setup(mobile: bool, fail: bool, hang: bool) -> (Scope, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let framework = Arc::new(Framework::new());
        framework.add_utility(BROWSER_UTILITY, move |_| BrowserInfo {
            mobile,
            ..BrowserInfo::default()
        });
        let counter = Arc::clone(&calls);
        framework.add_data_provider(PAGE_IMG, move |_| {
            Ok(Arc::new(Images {
                calls: Arc::clone(&counter),
                fail,
                hang,
            }) as Arc<dyn DataProvider>)
        });
        framework.add_component(PAGE_IMG, |scope| {
            Ok(Arc::new(PageImg::new(scope)?) as Arc<dyn Component>)
        });
        framework.add_component("error-sink", |_| {
            Ok(Arc::new(ErrorSink::default()) as Arc<dyn Component>)
        });
        (Scope::new(framework, ViewerConfig::default()), calls)
    }

    fn view(scope: &Scope, page: u32) -> (crate::core::scope::ComponentRef, Arc<Surface>) {
        let component = scope.create_component(PAGE_IMG).unwrap();
        let surface = Arc::new(Surface::default());
        component
            .downcast_ref::<PageImg>()
            .unwrap()
            .init(surface.clone(), page);
        (component, surface)
    }

    #[tokio::test]
    async fn load_is_shared_until_unload() {
        let (scope, calls) = setup(false, false, false);
        let (component, surface) = view(&scope, 4);
        let loader = component.instance().as_asset_loader().unwrap();

        let first = loader.load();
        let second = loader.load();
        assert_eq!(first.await, Ok(()));
        assert_eq!(second.await, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(surface.ops(), vec!["insert page-4.png"]);
    }

    #[tokio::test]
    async fn desktop_unload_hides_and_reload_shows() {
        let (scope, calls) = setup(false, false, false);
        let (component, surface) = view(&scope, 1);
        let loader = component.instance().as_asset_loader().unwrap();

        loader.load().await.unwrap();
        loader.unload();
        loader.load().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(surface.ops(), vec!["insert page-1.png", "hide", "show"]);
    }

    #[tokio::test]
    async fn mobile_unload_releases_and_reload_fetches() {
        let (scope, calls) = setup(true, false, false);
        let (component, surface) = view(&scope, 1);
        let loader = component.instance().as_asset_loader().unwrap();

        loader.load().await.unwrap();
        loader.unload();
        assert_eq!(component.downcast_ref::<PageImg>().unwrap().image_src(), None);
        loader.load().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            surface.ops(),
            vec!["insert page-1.png", "remove", "insert page-1.png"]
        );
    }

    #[tokio::test]
    async fn unload_aborts_pending_load() {
        let (scope, _) = setup(false, false, true);
        let (component, surface) = view(&scope, 2);
        let sink = scope.create_component("error-sink").unwrap();
        let loader = component.instance().as_asset_loader().unwrap();

        let pending = loader.load();
        loader.unload();
        assert_eq!(pending.await, Err(AssetError::Aborted));
        assert!(surface.ops().is_empty());
        assert!(sink.downcast_ref::<ErrorSink>().unwrap().received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unload_before_failure_lands_stays_silent() {
        let (scope, _) = setup(false, true, false);
        let (component, _) = view(&scope, 2);
        let sink = scope.create_component("error-sink").unwrap();
        let loader = component.instance().as_asset_loader().unwrap();

        let pending = loader.load();
        loader.unload();
        assert_eq!(pending.await, Err(AssetError::Aborted));
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(sink.downcast_ref::<ErrorSink>().unwrap().received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_is_broadcast_as_asseterror() {
        let (scope, _) = setup(false, true, false);
        let (component, _) = view(&scope, 2);
        let sink = scope.create_component("error-sink").unwrap();

        let result = component.instance().as_asset_loader().unwrap().load().await;
        assert!(result.is_err());

        let received = sink.downcast_ref::<ErrorSink>().unwrap().received.lock().unwrap().clone();
        assert_eq!(
            received,
            vec![serde_json::json!({ "error": "Not Found", "status": 404, "resource": "page.png" })]
        );
    }

    #[tokio::test]
    async fn destroy_clears_surface() {
        let (scope, _) = setup(false, false, false);
        let (component, surface) = view(&scope, 3);
        component.instance().as_asset_loader().unwrap().load().await.unwrap();

        scope.destroy_component(&component);
        assert_eq!(surface.ops(), vec!["insert page-3.png", "clear"]);
    }
}
