use eframe::egui;
use eframe::glow;
use glam::Vec2;
use mitospace_shared::{DatasetInfo, DatasetListResponse, Rgb, DATASET_2D, DATASET_4D};
use std::cell::RefCell;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::{api_base, ViewerConfig};
use crate::detail_panel;
use crate::renderer::{pointer_to_ndc, FrameSnapshot, Gesture, SceneRenderer};
use crate::state::{ColoringMode, RenderingMode, ViewerState, MAX_POINT_SIZE, MIN_POINT_SIZE};
use crate::store::{self, SampleList, SampleStore};
use crate::viewer::{DatasetLayout, Viewer};

#[derive(Error, Debug)]
pub enum FetchError {
    #[cfg(not(target_arch = "wasm32"))]
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[cfg(target_arch = "wasm32")]
    #[error("Request failed: {0}")]
    Request(#[from] gloo_net::Error),
    #[error("Server returned status {0}")]
    Status(u16),
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_text(url: &str) -> Result<String, FetchError> {
    let response = reqwest::blocking::get(url)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(response.text()?)
}

#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str) -> Result<String, FetchError> {
    let response = gloo_net::http::Request::get(url).send().await?;
    if !response.ok() {
        return Err(FetchError::Status(response.status()));
    }
    Ok(response.text().await?)
}

fn parse_dataset_list(body: &str) -> Result<Vec<DatasetInfo>, FetchError> {
    Ok(serde_json::from_str::<DatasetListResponse>(body)?.datasets)
}

fn points_url(base: &str, id: &str) -> String {
    format!("{}/api/datasets/{}/points", base, id)
}

/// Everything fetched at startup
struct LoadResult {
    datasets: Result<Vec<DatasetInfo>, String>,
    points_2d: Result<String, String>,
    points_4d: Result<String, String>,
}

/// Shared state for async operations
#[derive(Default)]
struct AsyncState {
    loaded: Option<LoadResult>,
}

/// Handed from `update` to the paint callback (no GL objects)
struct SharedRenderState {
    frame: Option<FrameSnapshot>,
    error: Option<String>,
    sprite_texture_size: usize,
}

enum RendererSlot {
    Uninit,
    Ready(SceneRenderer),
    Failed,
}

thread_local! {
    // GL objects can't cross threads; the paint callback owns the renderer
    static RENDERER: RefCell<RendererSlot> = const { RefCell::new(RendererSlot::Uninit) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Static,
    TimeSeries,
}

impl Tab {
    fn label(self) -> &'static str {
        match self {
            Tab::Static => "2D View",
            Tab::TimeSeries => "4D View",
        }
    }

    fn layout(self) -> DatasetLayout {
        match self {
            Tab::Static => DatasetLayout::Static,
            Tab::TimeSeries => DatasetLayout::TimeSeries,
        }
    }
}

/// Main application state
pub struct App {
    config: ViewerConfig,
    api_base: String,
    loading: bool,
    error: Option<String>,
    datasets: Vec<DatasetInfo>,
    store: SampleStore,
    timepoints_4d: Vec<u32>,
    state: ViewerState,
    /// Search box contents
    query: String,
    tab: Tab,
    viewer: Viewer,
    show_help: bool,
    async_state: Arc<Mutex<AsyncState>>,
    shared_render_state: Arc<Mutex<SharedRenderState>>,
}

impl App {
    fn flat_style() -> egui::Style {
        let mut style = egui::Style {
            visuals: egui::Visuals::light(),
            ..Default::default()
        };
        let corner = egui::Rounding::same(2.0);
        style.visuals.window_rounding = corner;
        style.visuals.widgets.inactive.rounding = corner;
        style.visuals.widgets.hovered.rounding = corner;
        style.visuals.widgets.active.rounding = corner;
        style.visuals.widgets.hovered.expansion = 0.0;
        style.visuals.widgets.active.expansion = 0.0;
        style.visuals.popup_shadow = egui::epaint::Shadow::NONE;
        style.spacing.item_spacing = egui::vec2(6.0, 6.0);
        style.spacing.button_padding = egui::vec2(6.0, 3.0);
        style
    }

    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_style(Self::flat_style());

        let config = ViewerConfig::default();
        let shared_render_state = Arc::new(Mutex::new(SharedRenderState {
            frame: None,
            error: None,
            sprite_texture_size: config.sprite_texture_size,
        }));

        let mut app = Self {
            viewer: Viewer::new(config.clone(), Tab::Static.layout()),
            config,
            api_base: api_base(),
            loading: true,
            error: None,
            datasets: Vec::new(),
            store: SampleStore::default(),
            timepoints_4d: Vec::new(),
            state: ViewerState::new(),
            query: String::new(),
            tab: Tab::Static,
            show_help: false,
            async_state: Arc::new(Mutex::new(AsyncState::default())),
            shared_render_state,
        };

        app.fetch_datasets();
        app
    }

    fn fetch_datasets(&mut self) {
        self.loading = true;
        self.error = None;
        let base = self.api_base.clone();

        #[cfg(not(target_arch = "wasm32"))]
        {
            let result = LoadResult {
                datasets: fetch_text(&format!("{}/api/datasets", base))
                    .and_then(|body| parse_dataset_list(&body))
                    .map_err(|e| e.to_string()),
                points_2d: fetch_text(&points_url(&base, DATASET_2D)).map_err(|e| e.to_string()),
                points_4d: fetch_text(&points_url(&base, DATASET_4D)).map_err(|e| e.to_string()),
            };
            if let Ok(mut state) = self.async_state.lock() {
                state.loaded = Some(result);
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let state = self.async_state.clone();

            wasm_bindgen_futures::spawn_local(async move {
                let datasets = match fetch_text(&format!("{}/api/datasets", base)).await {
                    Ok(body) => parse_dataset_list(&body),
                    Err(e) => Err(e),
                };
                let points_2d = fetch_text(&points_url(&base, DATASET_2D)).await;
                let points_4d = fetch_text(&points_url(&base, DATASET_4D)).await;

                if let Ok(mut state) = state.lock() {
                    state.loaded = Some(LoadResult {
                        datasets: datasets.map_err(|e| e.to_string()),
                        points_2d: points_2d.map_err(|e| e.to_string()),
                        points_4d: points_4d.map_err(|e| e.to_string()),
                    });
                }
            });
        }
    }

    fn poll_async_state(&mut self) {
        let loaded = match self.async_state.lock() {
            Ok(mut state) => state.loaded.take(),
            Err(_) => None,
        };
        let Some(loaded) = loaded else {
            return;
        };
        self.loading = false;

        match loaded.datasets {
            Ok(datasets) => self.datasets = datasets,
            Err(e) => log::warn!("Dataset listing unavailable: {}", e),
        }

        let mut failures = Vec::new();
        let mut document = |id: &str, result: Result<String, String>| match result {
            Ok(body) => Some(body),
            Err(e) => {
                log::warn!("Failed to fetch {}: {}", id, e);
                failures.push(format!("{}: {}", id, e));
                None
            }
        };
        let json_2d = document(DATASET_2D, loaded.points_2d);
        let json_4d = document(DATASET_4D, loaded.points_4d);
        self.error = (!failures.is_empty()).then(|| failures.join("\n"));

        self.store = SampleStore::from_documents(json_2d.as_deref(), json_4d.as_deref());
        self.timepoints_4d = store::timepoints(self.store.samples_4d());
        if let Some(&first) = self.timepoints_4d.first() {
            if !self.timepoints_4d.contains(&self.state.options().current_timepoint) {
                self.state.set_timepoint(first);
            }
        }

        if self.state.selected().is_none() {
            if let Some(control) = store::first_control(self.store.samples_2d()) {
                self.state.select(control);
            }
        }
    }

    fn current_source(&self) -> &SampleList {
        match self.tab {
            Tab::Static => self.store.samples_2d(),
            Tab::TimeSeries => self.store.samples_4d(),
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        if self.tab == tab {
            return;
        }
        log::info!("Switching to {}", tab.label());
        self.viewer.teardown();
        self.viewer = Viewer::new(self.config.clone(), tab.layout());
        self.tab = tab;
    }

    fn render_tabs(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("MitoSpace");
            ui.separator();
            for tab in [Tab::Static, Tab::TimeSeries] {
                if ui.selectable_label(self.tab == tab, tab.label()).clicked() {
                    self.switch_tab(tab);
                }
            }
        });
    }

    fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.label("Search:");
        let search = egui::TextEdit::singleline(&mut self.query).hint_text("Drug, phenotype, metadata...");
        if ui.add(search).changed() {
            self.state.set_query(&self.query);
        }

        ui.separator();

        ui.label("Color by:");
        let mut coloring = self.state.options().coloring_mode;
        ui.horizontal(|ui| {
            for mode in [ColoringMode::Treatment, ColoringMode::Phenotype] {
                ui.radio_value(&mut coloring, mode, mode.label());
            }
        });
        self.state.set_coloring_mode(coloring);

        ui.label("Point size:");
        let mut point_size = self.state.options().point_size;
        if ui
            .add(egui::Slider::new(&mut point_size, MIN_POINT_SIZE..=MAX_POINT_SIZE))
            .changed()
        {
            self.state.set_point_size(point_size);
        }

        ui.label("Rendering:");
        let mut rendering = self.state.options().rendering_mode;
        egui::ComboBox::from_id_salt("rendering_mode")
            .selected_text(rendering.label())
            .show_ui(ui, |ui| {
                for mode in [RenderingMode::Auto, RenderingMode::Points, RenderingMode::Instanced] {
                    ui.selectable_value(&mut rendering, mode, mode.label());
                }
            });
        self.state.set_rendering_mode(rendering);

        ui.horizontal(|ui| {
            ui.label("Background:");
            let mut background = self.state.options().background_color.to_array();
            if ui.color_edit_button_rgb(&mut background).changed() {
                let [r, g, b] = background;
                self.state.set_background_color(Rgb::new(r, g, b));
            }
        });

        if self.tab == Tab::TimeSeries && !self.timepoints_4d.is_empty() {
            ui.separator();
            let times = &self.timepoints_4d;
            let current = self.state.options().current_timepoint;
            let mut index = times.iter().position(|&t| t == current).unwrap_or(0);
            ui.label(format!("Timepoint: T{}", times[index]));
            let slider = egui::Slider::new(&mut index, 0..=times.len() - 1).show_value(false);
            if ui.add(slider).changed() {
                let t = times[index];
                self.state.set_timepoint(t);
            }
        }

        ui.separator();

        if self.loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading datasets...");
            });
        } else {
            for info in &self.datasets {
                ui.label(format!("{}: {} samples", info.name, info.sample_count));
                if let Some(version) = &info.version {
                    ui.weak(format!("version {}", version));
                }
            }
        }

        if let Some(error) = &self.error {
            ui.colored_label(egui::Color32::RED, error);
            if ui.button("Retry").clicked() {
                self.fetch_datasets();
            }
        }
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        let fps = 1.0 / ui.ctx().input(|i| i.stable_dt).max(0.001);
        ui.label(format!("{:.0} fps", fps));
        ui.label(format!("{} points", self.viewer.point_count()));
        ui.label("MitoSpace v0.1.0");
    }

    fn render_placeholder(ui: &mut egui::Ui, rect: egui::Rect, text: &str, color: egui::Color32) {
        let painter = ui.painter();
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(240, 240, 240));
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            text,
            egui::FontId::proportional(24.0),
            color,
        );
    }

    fn render_viewport(&mut self, ui: &mut egui::Ui) {
        let available_size = ui.available_size();
        let (rect, response) = ui.allocate_exact_size(available_size, egui::Sense::click_and_drag());

        if self.loading {
            Self::render_placeholder(ui, rect, "Loading datasets...", egui::Color32::GRAY);
            ui.ctx().request_repaint();
            return;
        }

        let render_error = self
            .shared_render_state
            .lock()
            .ok()
            .and_then(|state| state.error.clone());
        if let Some(error) = render_error {
            Self::render_placeholder(ui, rect, &error, egui::Color32::RED);
            return;
        }

        if self.viewer.is_attached() {
            self.viewer.resize(rect.width(), rect.height());
        } else if rect.width() >= 1.0 && rect.height() >= 1.0 {
            self.viewer.attach(rect.width(), rect.height());
        }

        let source = Arc::clone(self.current_source());
        self.viewer.sync(&self.state, &source);

        // Pointer input: start the gesture, feed it, resolve clicks, then end it
        if response.drag_started() {
            let gesture = if response.dragged_by(egui::PointerButton::Secondary) {
                Gesture::Pan
            } else if response.dragged_by(egui::PointerButton::Middle) {
                Gesture::Dolly
            } else {
                Gesture::Rotate
            };
            self.viewer.begin_gesture(gesture);
        }
        if response.dragged() {
            let delta = response.drag_delta();
            self.viewer.drag(Vec2::new(delta.x, delta.y));
        }
        if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let local = pointer - rect.min;
                let size = Vec2::new(rect.width(), rect.height());
                if let Some(ndc) = pointer_to_ndc(Vec2::new(local.x, local.y), size) {
                    self.viewer.handle_click(ndc, &mut self.state);
                }
            }
        }
        if response.drag_stopped() {
            self.viewer.end_gesture();
        }
        if response.hovered() {
            let (scroll, pinch) = ui.input(|i| (i.raw_scroll_delta.y, i.zoom_delta()));
            if scroll != 0.0 {
                self.viewer.scroll(scroll);
            }
            if pinch != 1.0 {
                self.viewer.pinch(pinch);
            }
        }

        let dt = ui.input(|i| i.stable_dt);
        let frame = self.viewer.tick(dt);

        let background = detail_panel::to_color32(self.state.options().background_color);
        ui.painter().rect_filled(rect, 0.0, background);

        if let Some(frame) = frame {
            if let Ok(mut state) = self.shared_render_state.lock() {
                state.frame = Some(frame);
            }

            // The callback owns the renderer (created lazily) and reads the frame from shared state
            let shared_state = self.shared_render_state.clone();
            let callback = egui::PaintCallback {
                rect,
                callback: Arc::new(egui_glow::CallbackFn::new(move |_info, painter| {
                    RENDERER.with(|cell| {
                        let mut slot = cell.borrow_mut();
                        let Ok(mut state) = shared_state.lock() else {
                            return;
                        };

                        if matches!(*slot, RendererSlot::Uninit) {
                            *slot = match SceneRenderer::new(painter.gl(), state.sprite_texture_size) {
                                Ok(renderer) => RendererSlot::Ready(renderer),
                                Err(e) => {
                                    log::error!("Failed to create scene renderer: {}", e);
                                    state.error = Some(e.to_string());
                                    RendererSlot::Failed
                                }
                            };
                        }

                        let RendererSlot::Ready(renderer) = &mut *slot else {
                            return;
                        };
                        let Some(frame) = state.frame.take() else {
                            return;
                        };
                        if let Err(e) = renderer.sync(painter.gl(), &frame) {
                            log::error!("Failed to upload scene: {}", e);
                            state.error = Some(e.to_string());
                            renderer.destroy(painter.gl());
                            *slot = RendererSlot::Failed;
                            return;
                        }
                        renderer.render(painter.gl(), &frame);
                    });
                })),
            };
            ui.painter().add(callback);
        }

        self.render_overlay(ui, rect);

        // Request continuous repaint for damping and transitions
        ui.ctx().request_repaint();
    }

    fn render_overlay(&mut self, ui: &mut egui::Ui, rect: egui::Rect) {
        egui::Area::new(egui::Id::new("viewport_controls"))
            .fixed_pos(rect.right_top() + egui::vec2(-56.0, 8.0))
            .order(egui::Order::Foreground)
            .show(ui.ctx(), |ui| {
                ui.vertical_centered(|ui| {
                    if ui.button("+").on_hover_text("Zoom in").clicked() {
                        self.viewer.zoom_in();
                    }
                    ui.small(format!("{}%", self.viewer.zoom_percentage()));
                    if ui.button("−").on_hover_text("Zoom out").clicked() {
                        self.viewer.zoom_out();
                    }
                    if ui.button("⟲").on_hover_text("Reset view").clicked() {
                        self.viewer.reset_camera();
                    }
                    if ui.button("?").on_hover_text("Navigation help").clicked() {
                        self.show_help = !self.show_help;
                    }
                });
            });

        egui::Window::new("Navigation Controls")
            .open(&mut self.show_help)
            .collapsible(false)
            .resizable(false)
            .show(ui.ctx(), |ui| {
                egui::Grid::new("navigation_help").num_columns(2).show(ui, |ui| {
                    for (input, action) in [
                        ("Left drag", "Rotate"),
                        ("Right drag", "Pan"),
                        ("Middle drag / scroll", "Zoom"),
                        ("Pinch", "Zoom"),
                        ("Click", "Select sample"),
                        ("⟲", "Reset view"),
                    ] {
                        ui.strong(input);
                        ui.label(action);
                        ui.end_row();
                    }
                });
            });
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.poll_async_state();

        if self.loading {
            ctx.request_repaint();
        }

        let has_gl = frame.gl().is_some();

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            self.render_tabs(ui);
        });

        egui::SidePanel::left("sidebar")
            .resizable(true)
            .default_width(250.0)
            .show(ctx, |ui| {
                self.render_sidebar(ui);
                ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                    self.render_footer(ui);
                });
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                detail_panel::show(ui, &mut self.state);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                if has_gl {
                    self.render_viewport(ui);
                } else {
                    // No GL context available
                    let rect = ui.available_rect_before_wrap();
                    Self::render_placeholder(ui, rect, "OpenGL not available", egui::Color32::RED);
                }
            });
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        self.viewer.teardown();
        if let Some(gl) = gl {
            RENDERER.with(|cell| {
                if let RendererSlot::Ready(mut renderer) = cell.replace(RendererSlot::Uninit) {
                    renderer.destroy(gl);
                }
            });
        }
    }
}
