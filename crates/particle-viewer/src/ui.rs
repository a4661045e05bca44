use particle_morph::{DeviceClass, Gesture, SceneFlags};

/// Snapshot of scene state shown in the HUD.
#[derive(Debug, Clone, Copy)]
pub struct HudState {
    pub flags: SceneFlags,
    pub current: Option<Gesture>,
    pub morph_progress: Option<f32>,
    pub particle_count: usize,
    pub device: DeviceClass,
}

/// Draws the status panel. Returns the gesture whose button was clicked.
pub fn draw_hud(ctx: &egui::Context, hud: &HudState) -> Option<Gesture> {
    let mut clicked = None;

    egui::Window::new("Scene")
        .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            let flags = hud.flags;
            if flags.loading {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading point clouds…");
                });
                return;
            }

            ui.label(format!(
                "{} particles ({:?})",
                hud.particle_count, hud.device
            ));
            ui.label(format!(
                "State: {}",
                hud.current.map_or("-", Gesture::as_str)
            ));

            match hud.morph_progress.filter(|_| flags.is_morphing) {
                Some(p) => {
                    ui.add(egui::ProgressBar::new(p).show_percentage().text("morphing"));
                }
                None => {
                    ui.label("At rest");
                }
            }

            ui.label(format!(
                "interactive: {}  revealed: {}",
                flags.is_interactive, flags.content_revealed
            ));

            ui.separator();
            ui.horizontal_wrapped(|ui| {
                for (i, gesture) in Gesture::ALL.into_iter().enumerate() {
                    let label = format!("{} {}", i + 1, gesture);
                    if ui
                        .selectable_label(hud.current == Some(gesture), label)
                        .clicked()
                    {
                        clicked = Some(gesture);
                    }
                }
            });

            if flags.is_interactive {
                ui.small("Drag to rotate");
            }
        });

    clicked
}
