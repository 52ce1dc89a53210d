use arboard::{Clipboard, ImageData};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use client_core::{ClientEvent, PromptSession};
use shared::domain::{scored_chip_label, ProbabilityReport, SceneGraph, ScoredLabel};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{classify_chain_failure, UiErrorCategory, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Service => "Service",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

struct PreviewImage {
    width: usize,
    height: usize,
    rgba: Vec<u8>,
}

pub struct StudioApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    session: PromptSession,

    status: String,
    status_banner: Option<StatusBanner>,

    image_texture: Option<egui::TextureHandle>,
    image_decode_failed: bool,
}

impl StudioApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            session: PromptSession::default(),
            status: "Backend worker starting...".to_string(),
            status_banner: None,
            image_texture: None,
            image_decode_failed: false,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    self.status =
                        format!("{} error: {}", err_label(err.category()), err.message());
                    if err.context() == UiErrorContext::BackendStartup {
                        self.status_banner = Some(StatusBanner {
                            severity: StatusBannerSeverity::Error,
                            message: self.status.clone(),
                        });
                    }
                }
                UiEvent::Pipeline(event) => self.apply_pipeline_event(event),
            }
        }
    }

    fn apply_pipeline_event(&mut self, event: ClientEvent) {
        let generation = event.generation();
        let fresh_image = matches!(event, ClientEvent::ImageRendered { .. });
        let status = match &event {
            ClientEvent::SceneGraphParsed { .. } => {
                "Scene graph parsed - deriving probabilities".to_string()
            }
            ClientEvent::ProbabilitiesDerived { .. } => "Probabilities derived".to_string(),
            ClientEvent::ChainFailed { message, .. } => classify_chain_failure(message),
            ClientEvent::ImageRequested { .. } => "Generating image".to_string(),
            ClientEvent::ImageRendered { .. } => "Image ready".to_string(),
            ClientEvent::ImageFailed { message, .. } => classify_chain_failure(message),
        };

        self.session.apply(event);

        // The session has already discarded stale traffic; only events from
        // the live submission may touch the status line or the texture.
        if generation == self.session.generation() {
            self.status = status;
            if fresh_image {
                self.image_texture = None;
                self.image_decode_failed = false;
            }
        }
    }

    fn submit_prompt(&mut self) {
        let Some(generation) = self.session.begin_submission() else {
            return;
        };
        self.image_texture = None;
        self.image_decode_failed = false;
        self.status = "Parsing prompt".to_string();
        let text = self.session.prompt.trim().to_string();
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::ProcessPrompt { generation, text },
            &mut self.status,
        );
    }

    fn busy_label(&self) -> Option<&'static str> {
        if self.session.chain.is_loading() {
            if self.session.scene_graph.is_some() {
                Some("Deriving probabilities...")
            } else {
                Some("Parsing prompt...")
            }
        } else if self.session.image.is_loading() {
            Some("Generating image...")
        } else {
            None
        }
    }

    fn show_prompt_editor(&mut self, ui: &mut egui::Ui) {
        ui.add_space(6.0);
        ui.heading("What image would you like to create?");
        ui.add_space(8.0);

        let chain_busy = self.session.chain.is_loading();
        ui.add_enabled_ui(!chain_busy, |ui| {
            ui.add(
                egui::TextEdit::multiline(&mut self.session.prompt)
                    .hint_text("Describe the image you want to create...")
                    .desired_rows(6)
                    .desired_width(f32::INFINITY),
            );
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let can_submit = !chain_busy && !self.session.prompt.trim().is_empty();
            let label = if chain_busy { "Processing..." } else { "Generate" };
            let button = egui::Button::new(egui::RichText::new(label).strong());
            if ui.add_enabled(can_submit, button).clicked() {
                self.submit_prompt();
            }
            if let Some(busy) = self.busy_label() {
                ui.add(egui::Spinner::new());
                ui.weak(busy);
            }
        });
    }

    fn show_startup_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::NONE
                .fill(fill)
                .stroke(stroke)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
            ui.add_space(8.0);
        }
    }

    fn show_error_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(error) = self.session.error.clone() {
            egui::Frame::NONE
                .fill(egui::Color32::from_rgb(111, 53, 53))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&error).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.session.dismiss_error();
                            }
                        });
                    });
                });
            ui.add_space(8.0);
        }
    }

    fn show_results(&mut self, ui: &mut egui::Ui) {
        self.show_startup_banner(ui);
        self.show_error_banner(ui);

        if !self.session.has_results() && !self.session.is_busy() {
            ui.add_space(48.0);
            ui.vertical_centered(|ui| {
                ui.weak("Enter a prompt to generate a scene graph, probabilities, and an image");
            });
            return;
        }

        if let Some(graph) = &self.session.scene_graph {
            show_scene_graph(ui, graph);
        }
        if let Some(report) = &self.session.probabilities {
            show_probabilities(ui, report);
        }
        self.show_image_section(ui);
    }

    fn show_image_section(&mut self, ui: &mut egui::Ui) {
        if self.session.image.is_loading() {
            ui.heading("Generated image");
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.weak("Generating image...");
            });
            return;
        }

        if self.session.image_bytes.is_none() {
            return;
        }

        ui.heading("Generated image");
        ui.add_space(4.0);
        self.ensure_image_texture(ui.ctx());

        let texture = self.image_texture.clone();
        if let Some(texture) = texture {
            ui.add(
                egui::Image::new(&texture)
                    .max_width(ui.available_width().min(640.0))
                    .corner_radius(6.0),
            );
            ui.add_space(4.0);

            let mut save_clicked = false;
            let mut copy_clicked = false;
            ui.horizontal(|ui| {
                save_clicked = ui.button("Save image as...").clicked();
                copy_clicked = ui.button("Copy image").clicked();
            });
            if save_clicked {
                if let Some(bytes) = self.session.image_bytes.clone() {
                    self.save_image_bytes_as(&bytes, "scene-studio-image.png");
                }
            }
            if copy_clicked {
                if let Some(bytes) = self.session.image_bytes.clone() {
                    self.copy_image_to_clipboard(&bytes);
                }
            }
        } else if self.image_decode_failed {
            ui.weak("The image payload could not be decoded.");
        }
    }

    fn ensure_image_texture(&mut self, ctx: &egui::Context) {
        if self.image_texture.is_some() || self.image_decode_failed {
            return;
        }
        let Some(bytes) = self.session.image_bytes.as_deref() else {
            return;
        };

        match decode_preview_image(bytes) {
            Ok(image) => {
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    [image.width, image.height],
                    &image.rgba,
                );
                self.image_texture = Some(ctx.load_texture(
                    "generated-image",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
            Err(err) => {
                tracing::warn!("failed to decode generated image: {err}");
                self.image_decode_failed = true;
                self.status = format!("Failed to decode generated image: {err}");
            }
        }
    }

    fn save_image_bytes_as(&mut self, bytes: &[u8], suggested_name: &str) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(suggested_name)
            .save_file()
        {
            match std::fs::write(&path, bytes) {
                Ok(()) => {
                    self.status = format!("Saved image to {}", path.display());
                }
                Err(err) => {
                    self.status = format!("Failed to save image: {err}");
                }
            }
        }
    }

    fn copy_image_to_clipboard(&mut self, bytes: &[u8]) {
        match decode_image_for_clipboard(bytes)
            .and_then(|(rgba, width, height)| write_clipboard_image(&rgba, width, height))
        {
            Ok(()) => self.status = "Copied generated image to clipboard".to_string(),
            Err(err) => self.status = format!("Failed to copy image: {err}"),
        }
    }
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        if self.session.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(120));
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.small("Status:");
                ui.small(egui::RichText::new(&self.status).weak());
            });
        });

        egui::SidePanel::left("prompt_panel")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| self.show_prompt_editor(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| self.show_results(ui));
        });
    }
}

fn show_scene_graph(ui: &mut egui::Ui, graph: &SceneGraph) {
    ui.heading("Scene graph");
    ui.add_space(4.0);

    ui.label(egui::RichText::new("Entities").strong());
    for entity in graph.entities.values() {
        ui.label(format!("• {}", entity.display_label()));
    }

    if !graph.relationships.is_empty() {
        ui.add_space(4.0);
        ui.label(egui::RichText::new("Relationships").strong());
        for relationship in &graph.relationships {
            ui.label(format!("• {}", relationship.display_label()));
        }
    }
    ui.add_space(12.0);
}

fn show_probabilities(ui: &mut egui::Ui, report: &ProbabilityReport) {
    ui.heading("Probabilities");
    ui.add_space(4.0);

    if !report.attr_probs.is_empty() {
        ui.label(egui::RichText::new("Attributes").strong());
        for (object, pairs) in &report.attr_probs {
            ui.horizontal_wrapped(|ui| {
                ui.label(format!("{object}:"));
                chip_row(ui, pairs);
            });
        }
        ui.add_space(4.0);
    }

    if !report.relation_probs.is_empty() {
        ui.label(egui::RichText::new("Relations").strong());
        for (pair_key, pairs) in &report.relation_probs {
            ui.horizontal_wrapped(|ui| {
                ui.label(format!("{}:", relation_pair_label(pair_key)));
                chip_row(ui, pairs);
            });
        }
        ui.add_space(4.0);
    }

    if !report.co_occur_probs.is_empty() {
        ui.label(egui::RichText::new("Likely co-occurring objects").strong());
        ui.horizontal_wrapped(|ui| chip_row(ui, &report.co_occur_probs));
        ui.add_space(4.0);
    }

    if !report.evidences.is_empty() {
        ui.collapsing("Evidence", |ui| {
            for evidence in &report.evidences {
                ui.small(evidence);
            }
        });
    }
    ui.add_space(12.0);
}

fn chip_row(ui: &mut egui::Ui, pairs: &[ScoredLabel]) {
    for (name, probability) in pairs {
        chip(ui, &scored_chip_label(name, *probability));
    }
}

fn chip(ui: &mut egui::Ui, text: &str) {
    egui::Frame::NONE
        .fill(ui.visuals().faint_bg_color)
        .stroke(egui::Stroke::new(
            1.0,
            ui.visuals().widgets.noninteractive.bg_stroke.color,
        ))
        .corner_radius(10.0)
        .inner_margin(egui::Margin::symmetric(8, 3))
        .show(ui, |ui| {
            ui.small(text);
        });
}

/// Relation keys arrive as `subject_object` pairs.
fn relation_pair_label(pair_key: &str) -> String {
    pair_key.replacen('_', " → ", 1)
}

fn decode_preview_image(bytes: &[u8]) -> Result<PreviewImage, String> {
    let dynamic = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let resized = dynamic.thumbnail(1024, 1024).to_rgba8();
    let width = resized.width() as usize;
    let height = resized.height() as usize;
    Ok(PreviewImage {
        width,
        height,
        rgba: resized.into_raw(),
    })
}

fn decode_image_for_clipboard(bytes: &[u8]) -> Result<(Vec<u8>, usize, usize), String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = decoded.to_rgba8();
    Ok((
        rgba.as_raw().to_vec(),
        rgba.width() as usize,
        rgba.height() as usize,
    ))
}

fn write_clipboard_image(rgba: &[u8], width: usize, height: usize) -> Result<(), String> {
    let mut clipboard = Clipboard::new().map_err(|err| err.to_string())?;
    clipboard
        .set_image(ImageData {
            width,
            height,
            bytes: std::borrow::Cow::Owned(rgba.to_vec()),
        })
        .map_err(|err| err.to_string())
}
