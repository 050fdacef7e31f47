//! Side panel describing the selected sample.

use eframe::egui;
use mitospace_shared::{Media, Rgb, Sample};

use crate::state::{display_color, ViewerState};

const DARK_TEXT: egui::Color32 = egui::Color32::from_rgb(20, 20, 20);
const LIGHT_TEXT: egui::Color32 = egui::Color32::WHITE;

pub fn to_color32(color: Rgb) -> egui::Color32 {
    let [r, g, b] = color.to_rgb8();
    egui::Color32::from_rgb(r, g, b)
}

/// Dark text on light backgrounds, light text on dark ones
pub fn contrast_text_color(background: Rgb) -> egui::Color32 {
    if background.luminance() > 0.5 {
        DARK_TEXT
    } else {
        LIGHT_TEXT
    }
}

/// `RGB(r, g, b)` with 0-255 channels
pub fn rgb_readout(color: Rgb) -> String {
    let [r, g, b] = color.to_rgb8();
    format!("RGB({}, {}, {})", r, g, b)
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Draw the panel. The close button clears the selection.
pub fn show(ui: &mut egui::Ui, state: &mut ViewerState) {
    let Some(sample) = state.selected().cloned() else {
        ui.heading("Sample Details");
        ui.separator();
        ui.label("Click a point to view sample details.");
        return;
    };

    let tint = display_color(&sample, state.options().coloring_mode);
    if header(ui, &sample, tint) {
        state.clear_selection();
        return;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.add_space(4.0);
        ui.label(format!(
            "Position: ({:.3}, {:.3}, {:.3})",
            sample.x, sample.y, sample.z
        ));

        ui.separator();
        ui.strong("Treatment");
        treatment_table(ui, &sample);

        ui.separator();
        ui.strong("Colors");
        swatch(ui, "Treatment", sample.color);
        swatch(ui, "Phenotype", sample.color_phenotypic);

        media_list(ui, &sample);

        if !sample.metadata.is_empty() {
            ui.separator();
            ui.strong("Metadata");
            egui::Grid::new("sample_metadata")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    for (key, value) in &sample.metadata {
                        ui.label(key.as_str());
                        ui.label(value.to_string());
                        ui.end_row();
                    }
                });
        }
    });
}

/// Returns true when the close button was clicked
fn header(ui: &mut egui::Ui, sample: &Sample, tint: Rgb) -> bool {
    let text_color = contrast_text_color(tint);
    let mut close = false;

    egui::Frame::none()
        .fill(to_color32(tint))
        .inner_margin(egui::Margin::same(8.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                let title = if sample.treatment.drug.is_empty() {
                    sample.id.as_str()
                } else {
                    sample.treatment.drug.as_str()
                };
                ui.label(
                    egui::RichText::new(title)
                        .color(text_color)
                        .size(18.0)
                        .strong(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let button = egui::Button::new(egui::RichText::new("✕").color(text_color))
                        .frame(false);
                    close = ui.add(button).on_hover_text("Close").clicked();
                });
            });
            ui.horizontal(|ui| {
                let phenotype = if sample.phenotype.is_empty() {
                    sample.phenotype_class().label().to_string()
                } else {
                    sample.phenotype.clone()
                };
                badge(ui, &phenotype, text_color);
                if let Some(t) = sample.t {
                    badge(ui, &format!("T{}", t), text_color);
                }
                ui.label(egui::RichText::new(format!("#{}", sample.id)).color(text_color).small());
            });
        });

    close
}

fn badge(ui: &mut egui::Ui, text: &str, color: egui::Color32) {
    egui::Frame::none()
        .stroke(egui::Stroke::new(1.0, color))
        .rounding(egui::Rounding::same(6.0))
        .inner_margin(egui::Margin::symmetric(6.0, 1.0))
        .show(ui, |ui| {
            ui.label(egui::RichText::new(text).color(color).small());
        });
}

fn treatment_table(ui: &mut egui::Ui, sample: &Sample) {
    let treatment = &sample.treatment;
    egui::Grid::new("sample_treatment")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui| {
            ui.label("Drug");
            ui.label(or_na(&treatment.drug.to_uppercase()));
            ui.end_row();

            ui.label("Dose");
            ui.label(or_na(&treatment.dose));
            ui.end_row();

            ui.label("Duration");
            ui.label(or_na(&treatment.time));
            ui.end_row();

            ui.label("SMILES");
            ui.label(or_na(treatment.smiles.as_deref().unwrap_or_default()));
            ui.end_row();

            ui.label("PubChem");
            match (treatment.pubchem.as_deref(), treatment.pubchem_url()) {
                (Some(id), Some(url)) => {
                    ui.hyperlink_to(id, url);
                }
                _ => {
                    ui.label("N/A");
                }
            }
            ui.end_row();
        });
}

fn swatch(ui: &mut egui::Ui, label: &str, color: Rgb) {
    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(16.0, 16.0), egui::Sense::hover());
        ui.painter().rect_filled(rect, 2.0, to_color32(color));
        ui.label(label);
        ui.weak(rgb_readout(color));
    });
}

fn media_list(ui: &mut egui::Ui, sample: &Sample) {
    let (title, items) = match sample.media() {
        Media::Videos(items) => ("4D Movie", items),
        Media::Images(items) => ("Images", items),
        Media::None => return,
    };
    ui.separator();
    ui.strong(title);
    for item in items {
        ui.hyperlink_to(item.as_str(), item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_text_contrasts_with_tint() {
        assert_eq!(contrast_text_color(Rgb::WHITE), DARK_TEXT);
        assert_eq!(contrast_text_color(Rgb::new(1.0, 1.0, 0.0)), DARK_TEXT);
        assert_eq!(contrast_text_color(Rgb::BLACK), LIGHT_TEXT);
        assert_eq!(contrast_text_color(Rgb::new(0.0, 0.0, 1.0)), LIGHT_TEXT);
    }

    #[test]
    fn readout_uses_byte_channels() {
        assert_eq!(rgb_readout(Rgb::new(1.0, 0.5, 0.0)), "RGB(255, 128, 0)");
        assert_eq!(rgb_readout(Rgb::new(2.0, -1.0, f32::NAN)), "RGB(255, 0, 0)");
        assert_eq!(to_color32(Rgb::WHITE), egui::Color32::WHITE);
    }

    #[test]
    fn blank_fields_read_as_not_available() {
        assert_eq!(or_na(""), "N/A");
        assert_eq!(or_na("  "), "N/A");
        assert_eq!(or_na("10 µM"), "10 µM");
    }
}
