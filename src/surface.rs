// ABOUTME: Chrome DevTools Protocol binding for the surface adapter seam
// ABOUTME: Drives the browser-rendered UI via chromiumoxide element queries

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;

use tavern_core::config::{DriverKind, Selectors, SurfaceConfig};
use tavern_core::traits::{ResponseUnit, SurfaceAdapter, SurfaceDriver};

/// The identity selector animates open; give it a beat before listing entries
const SELECTOR_OPEN_DELAY: Duration = Duration::from_millis(300);

/// Launches a chromium-family browser and hands out CDP-backed adapters
pub struct CdpDriver {
    config: SurfaceConfig,
}

impl CdpDriver {
    pub fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder().window_size(1280, 720);
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.driver_path {
            builder = builder.chrome_executable(std::path::PathBuf::from(path));
        }
        builder
            .build()
            .map_err(|e| anyhow::anyhow!("Browser config error: {}", e))
    }
}

#[async_trait]
impl SurfaceDriver for CdpDriver {
    async fn open(&self, endpoint: &str) -> Result<Box<dyn SurfaceAdapter>> {
        tracing::info!(
            endpoint = %endpoint,
            driver = ?self.config.driver,
            headless = self.config.headless,
            "Launching browser"
        );
        if self.config.driver == DriverKind::Edge && self.config.driver_path.is_none() {
            tracing::warn!("Edge selected without an explicit binary path; relying on auto-detect");
        }

        let (browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .context("Failed to launch browser")?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                tracing::trace!(?event, "Browser event");
            }
        });

        let page = browser
            .new_page(endpoint)
            .await
            .context("Failed to open surface page")?;
        page.wait_for_navigation()
            .await
            .context("Surface page did not finish loading")?;
        tracing::info!("Browser page ready");

        Ok(Box::new(CdpSurface {
            browser: Mutex::new(Some(browser)),
            page,
            selectors: self.config.selectors.clone(),
        }))
    }
}

/// One live page against the surface. Elements are resolved fresh per call;
/// handles are never cached across re-renders.
pub struct CdpSurface {
    browser: Mutex<Option<Browser>>,
    page: Page,
    selectors: Selectors,
}

impl CdpSurface {
    async fn input_element(&self) -> Result<Element> {
        self.page
            .find_element(&self.selectors.input)
            .await
            .context("Input control not found")
    }

    async fn read_unit(&self, element: &Element, position: usize) -> Result<ResponseUnit> {
        let speaker = element
            .attribute("ch_name")
            .await?
            .filter(|s| !s.trim().is_empty());
        let element_id = element
            .attribute("id")
            .await?
            .filter(|s| !s.trim().is_empty());
        let text = match element.find_element(&self.selectors.unit_text).await {
            Ok(inner) => inner.inner_text().await?.unwrap_or_default(),
            // Text container can be missing while the unit mounts
            Err(_) => String::new(),
        };
        Ok(ResponseUnit {
            speaker,
            text,
            position,
            element_id,
        })
    }
}

#[async_trait]
impl SurfaceAdapter for CdpSurface {
    async fn list_units(&self) -> Result<Vec<ResponseUnit>> {
        let elements = self.page.find_elements(&self.selectors.unit).await?;
        let mut units = Vec::with_capacity(elements.len());
        for (position, element) in elements.iter().enumerate() {
            match self.read_unit(element, position).await {
                Ok(unit) => units.push(unit),
                Err(e) => {
                    // The unit re-rendered out from under us; skip it, the
                    // next poll sees the settled version
                    tracing::trace!(position, error = %e, "Skipping unreadable unit");
                }
            }
        }
        Ok(units)
    }

    async fn is_producing(&self) -> Result<bool> {
        let expr = format!(
            "(() => {{
                const el = document.querySelector({selector:?});
                if (!el) return false;
                const style = window.getComputedStyle(el);
                return style.display !== 'none' && style.visibility !== 'hidden';
            }})()",
            selector = self.selectors.producing
        );
        let visible = self.page.evaluate(expr).await?.into_value::<bool>()?;
        Ok(visible)
    }

    async fn input_ready(&self) -> Result<bool> {
        Ok(self.page.find_element(&self.selectors.input).await.is_ok())
    }

    async fn clear_input(&self) -> Result<()> {
        let expr = format!(
            "(() => {{
                const el = document.querySelector({selector:?});
                if (!el) return;
                el.value = '';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            }})()",
            selector = self.selectors.input
        );
        self.page.evaluate(expr).await?;
        Ok(())
    }

    async fn submit_text(&self, text: &str) -> Result<()> {
        let input = self.input_element().await?;
        input.click().await.context("Could not focus input")?;
        input
            .type_str(text)
            .await
            .context("Could not type into input")?;
        input
            .press_key("Enter")
            .await
            .context("Could not submit input")?;
        Ok(())
    }

    async fn identity_entries(&self) -> Result<Vec<String>> {
        let opener = self
            .page
            .find_element(&self.selectors.identity_open)
            .await
            .context("Identity selector not found")?;
        opener.click().await.context("Could not open selector")?;
        tokio::time::sleep(SELECTOR_OPEN_DELAY).await;

        let items = self.page.find_elements(&self.selectors.identity_item).await?;
        let mut names = Vec::with_capacity(items.len());
        for item in &items {
            let name = match item.find_element(&self.selectors.identity_name).await {
                Ok(label) => label.inner_text().await?.unwrap_or_default(),
                Err(_) => String::new(),
            };
            names.push(name.trim().to_string());
        }
        Ok(names)
    }

    async fn activate_identity(&self, index: usize) -> Result<()> {
        let items = self.page.find_elements(&self.selectors.identity_item).await?;
        let item = items
            .get(index)
            .with_context(|| format!("Identity entry {} no longer present", index))?;
        item.click().await.context("Could not activate identity")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            tracing::info!("Closing browser");
            if let Err(e) = browser.close().await {
                tracing::warn!(error = %e, "Browser close failed");
            }
            let _ = browser.wait().await;
        }
        Ok(())
    }
}
