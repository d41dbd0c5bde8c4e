use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lib_docview::components::{PageImg, PageSurface, PAGE_IMG};
use lib_docview::providers::register_src_providers;
use lib_docview::retrieve::{
    Ajax, RequestHandle, RequestOptions, RequestRecord, Transport, AJAX_UTILITY,
};
use lib_docview::utils::browser::{BrowserInfo, BROWSER_UTILITY};
use lib_docview::{AssetError, DocviewSettings, Framework, Locator, Scope};

/// Answers requests in order from a script and remembers every URL.
#[derive(Default)]
struct QueuedTransport {
    answers: Mutex<VecDeque<Result<RequestRecord, RequestRecord>>>,
    urls: Mutex<Vec<String>>,
}

impl QueuedTransport {
    fn new(bodies: &[&str]) -> Arc<Self> {
        let answers = bodies
            .iter()
            .map(|body| Ok(RequestRecord::new(200, "OK", Some(body.to_string()))))
            .collect();
        Arc::new(Self {
            answers: Mutex::new(answers),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Transport for QueuedTransport {
    fn request(&self, url: &str, options: RequestOptions) -> RequestHandle {
        self.urls.lock().unwrap().push(url.to_string());
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RequestRecord::unavailable()));
        options.complete(answer);
        RequestHandle::finished()
    }
}

#[derive(Default)]
struct Canvas {
    inserted: Mutex<Vec<String>>,
}

impl PageSurface for Canvas {
    fn insert_image(&self, src: &str) {
        self.inserted.lock().unwrap().push(src.to_string());
    }
    fn show_image(&self) {}
    fn hide_image(&self) {}
    fn remove_image(&self) {}
    fn clear(&self) {}
}

fn settings() -> DocviewSettings {
    DocviewSettings::from_json5_str(
        r#"{
            viewer: { url: "/assets/", queryString: "?t=1" },
            transport: {
                origin: "https://docs.test/",
                retryMinIntervalMs: 1,
                retryMaxIntervalMs: 1,
            },
            browser: { mobile: true },
        }"#,
    )
    .unwrap()
}

fn bootstrapped(transport: Arc<QueuedTransport>) -> (Arc<Framework>, Scope) {
    let settings = settings();
    let framework = Framework::bootstrap_with_transport(&settings, transport).unwrap();
    let scope = Scope::new(Arc::clone(&framework), settings.viewer);
    (framework, scope)
}

#[test]
fn registers_utilities_providers_and_components() {
    let (framework, scope) = bootstrapped(QueuedTransport::new(&[]));

    for name in ["page-svg", "page-text", "page-img"] {
        assert!(framework.has_data_provider(name), "{name} is registered");
    }
    assert!(!framework.has_data_provider("page-pdf"));

    let ajax = scope.get_utility::<Ajax>(AJAX_UTILITY).unwrap();
    assert_eq!(ajax.origin().map(|url| url.as_str()), Some("https://docs.test/"));
    let browser = scope.get_utility::<BrowserInfo>(BROWSER_UTILITY).unwrap();
    assert!(browser.mobile);

    let component = scope.create_component(PAGE_IMG).unwrap();
    assert!(component.downcast_ref::<PageImg>().is_some());
}

#[tokio::test]
async fn page_providers_fetch_by_page_number() {
    let transport = QueuedTransport::new(&[
        r#"<svg><xhtml:link href="p.css"/></svg>"#,
        "<link rel=\"stylesheet\" href=\"p.css\">\n<div>t</div>",
        "\u{89}PNG",
    ]);
    let (_, scope) = bootstrapped(transport.clone());

    let svg = scope.get("page-svg", 2u32).await.unwrap();
    assert_eq!(svg.as_deref(), Some("<svg><style></style></svg>"));

    let text = scope.get("page-text", 2u32).await.unwrap();
    assert_eq!(text.as_deref(), Some("\n<div>t</div>"));

    let img = scope.get("page-img", 2u32).await.unwrap();
    assert_eq!(img.as_deref(), Some("https://docs.test/assets/page-2.png?t=1"));

    assert_eq!(
        transport.urls(),
        vec![
            "https://docs.test/assets/page-2.svg?t=1",
            // Resolved against the origin by the transport itself.
            "/assets/text-2.html?t=1",
            "https://docs.test/assets/page-2.png?t=1",
        ]
    );
}

#[tokio::test]
async fn page_img_component_draws_through_the_provider() {
    let (_, scope) = bootstrapped(QueuedTransport::new(&["\u{89}PNG"]));
    let component = scope.create_component(PAGE_IMG).unwrap();
    let canvas = Arc::new(Canvas::default());
    component
        .downcast_ref::<PageImg>()
        .unwrap()
        .init(canvas.clone(), 5);

    component.instance().as_asset_loader().unwrap().load().await.unwrap();
    assert_eq!(
        *canvas.inserted.lock().unwrap(),
        vec!["https://docs.test/assets/page-5.png?t=1"]
    );
}

#[tokio::test]
async fn src_providers_take_over_with_a_single_request() {
    // A retrying provider would resolve the text layer with the second answer.
    let transport = QueuedTransport::new(&["", "<svg>raw</svg>"]);
    let (framework, _) = bootstrapped(transport.clone());
    register_src_providers(&framework);
    let scope = Scope::new(Arc::clone(&framework), settings().viewer);

    let err = scope
        .get("page-text", Locator::Src("https://cdn.test/t.html".into()))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AssetError::EmptyResponse {
            status: 200,
            resource: "https://cdn.test/t.html".into(),
        }
    );
    assert_eq!(transport.urls(), vec!["https://cdn.test/t.html"]);

    let svg = scope
        .get("page-svg", Locator::Src("https://cdn.test/p.svg".into()))
        .await
        .unwrap();
    assert_eq!(svg.as_deref(), Some("<svg>raw</svg>"));
    assert_eq!(transport.urls().len(), 2);
}

#[test]
fn get_outside_a_runtime_rejects_instead_of_panicking() {
    let framework = Framework::bootstrap(&DocviewSettings::default()).unwrap();
    let scope = Scope::new(framework, settings().viewer);

    let future = scope.get("page-svg", 1u32);
    assert_eq!(future.peek(), Some(Err(AssetError::NoRuntime)));
}
