use std::{
    sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}},
    rc::Rc,
    cell::RefCell,
};

use three_d::*;
use bus::{Bus, BusReader};

use crate::log; // macro import
use crate::utils::*;
use crate::scene::*;
use crate::settings::{DemoKind, Settings};
use crate::animator::{CameraPose, FlightAnimator, FlightRenderer, flight_target, LAST_FRAME};


const ASSET_BUS_LEN: usize = 4;


/// Re-implementation of three_d::OrbitControl to add right mouse button panning
pub struct OrbitControl2 {
    control: CameraControl,
}
impl OrbitControl2 {
    /// Creates a new orbit control with the given target and minimum and maximum distance to the target.
    pub fn new(target: Vec3, min_distance: f32, max_distance: f32) -> Self {
        Self {
            control: CameraControl {
                left_drag_horizontal: CameraAction::OrbitLeft { target, speed: 0.1 },
                left_drag_vertical: CameraAction::OrbitUp { target, speed: 0.1 },
                scroll_vertical: CameraAction::Zoom {
                    min: min_distance,
                    max: max_distance,
                    speed: 0.01,
                    target,
                },
                right_drag_horizontal: CameraAction::Left { speed: 0.01 },
                right_drag_vertical: CameraAction::Up { speed: 0.01 },
                ..Default::default()
            },
        }
    }

    /// Moves the orbit center, e.g. after the camera has been placed by the flythrough
    pub fn set_target(&mut self, new_target: Vec3) {
        if let CameraAction::Zoom { target, .. } = &mut self.control.scroll_vertical {
            *target = new_target;
        }
        if let CameraAction::OrbitLeft { target, .. } = &mut self.control.left_drag_horizontal {
            *target = new_target;
        }
        if let CameraAction::OrbitUp { target, .. } = &mut self.control.left_drag_vertical {
            *target = new_target;
        }
    }

    /// Handles the events. Must be called each frame.
    pub fn handle_events(&mut self, camera: &mut Camera, events: &mut [Event]) -> bool {

        // panning moves the orbit center along with the camera
        let mut change = Vec3::zero();
        for event in events.iter() {
            if let Event::MouseMotion { delta, button: Some(MouseButton::Right), .. } = event {
                if let CameraAction::Left { speed } = &self.control.right_drag_horizontal {
                    change += -camera.right_direction() * delta.0 * (*speed);
                }
                if let CameraAction::Up { speed } = &self.control.right_drag_vertical {
                    let right = camera.right_direction();
                    let up = right.cross(camera.view_direction());
                    change += up * delta.1 * (*speed);
                }
                break;
            }
        }

        if let CameraAction::Zoom { speed, target, .. } = &mut self.control.scroll_vertical {
            let x = target.distance(*camera.position());
            *speed = 0.001 * x + 0.001;
            *target += change;
        }
        if let CameraAction::OrbitLeft { speed, target } = &mut self.control.left_drag_horizontal {
            let x = target.distance(*camera.position());
            *speed = 0.01 * x + 0.001;
            *target += change;
        }
        if let CameraAction::OrbitUp { speed, target } = &mut self.control.left_drag_vertical {
            let x = target.distance(*camera.position());
            *speed = 0.01 * x + 0.001;
            *target += change;
        }

        self.control.handle_events(camera, events)
    }
}


/// Render passes of the tabletop demo for one frame
struct TabletopPasses<'a> {
    screen: RenderTarget<'a>,
    skybox: Option<&'a Skybox>,
    scene: &'a TabletopScene,
}
impl FlightRenderer<Camera> for TabletopPasses<'_> {
    fn render_primary(&mut self, camera: &Camera) {
        self.screen.clear(ClearState::color_and_depth(0.55, 0.6, 0.65, 1.0, 1.0));
        if let Some(skybox) = self.skybox {
            self.screen.render(camera, skybox, &[]);
        }
        self.screen.render(camera, &self.scene.meshes, &self.scene.lights());
    }

    fn render_overlay(&mut self, camera: &Camera) {
        self.screen.render(camera, &self.scene.panel, &[]);
    }
}


/// Opens the canvas-sized window both demos draw into
fn open_window(title: &str) -> Result<Window, String> {
    let canvas_w = get_canvas_width();
    let canvas_h = get_canvas_height();
    log!("open_window(): canvas size: {}x{}", canvas_w, canvas_h);

    Window::new(WindowSettings {
        title: title.to_string(),
        max_size: Some((canvas_w, canvas_h)),
        ..Default::default()
    })
    .map_err(|e| format!("could not create a window: {:?}", e))
}


/// Bus for "asset ready" events from the async loaders to the render loop
fn asset_bus() -> (Rc<RefCell<Bus<SceneAsset>>>, BusReader<SceneAsset>) {
    let mut bus = Bus::<SceneAsset>::new(ASSET_BUS_LEN);
    let rx = bus.add_rx();
    (Rc::new(RefCell::new(bus)), rx)
}


fn show_warnings(gui_context: &egui::Context, flag: &Arc<AtomicBool>, msg: &Arc<Mutex<String>>) {
    if !flag.load(Ordering::Relaxed) {
        return;
    }
    egui::Window::new("Warning")
        .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
        .show(gui_context, |ui| {
            if let Ok(mutex) = msg.lock() {
                ui.colored_label(egui::Color32::YELLOW, &(*mutex));
            }
            if ui.button("Dismiss").clicked() {
                flag.store(false, Ordering::Relaxed);
            }
        });
}


pub async fn main(settings: Settings) -> Result<(), String> {
    log!("main(): {:?}", settings);
    match settings.demo {
        DemoKind::Skybox => run_skybox(settings),
        DemoKind::Tabletop => run_tabletop(settings),
    }
}


/// Skybox around a camera near the origin, lit by a single point light
fn run_skybox(settings: Settings) -> Result<(), String> {
    let warning_flag = Arc::new(AtomicBool::new(false));
    let warning_msg = Arc::new(Mutex::new(String::new()));

    let window = open_window("Skybox")?;
    let context = window.gl();
    log!("run_skybox(): OpenGL version: {:?}", context.version());

    let mut camera = Camera::new_perspective(
        window.viewport(),
        vec3(0.0, 0.0, 1.0),
        vec3(0.0, 0.0, 0.0),
        vec3(0.0, 1.0, 0.0),
        degrees(settings.fov_degrees),
        0.1,
        1000.0,
    );
    let mut orbit_control = OrbitControl2::new(*camera.target(), 0.5, 100.0);

    let scene = SkyboxScene::new(&context);
    let mut skybox: Option<Skybox> = None;

    let (bus_assets, mut rx_assets) = asset_bus();
    load_skybox(settings.skybox_url.clone(), bus_assets);

    let mut gui = three_d::GUI::new(&context);
    let mut pointer_over_gui = false;

    window.render_loop(move |mut frame_input| {
        camera.set_viewport(frame_input.viewport);

        // non-blocking (i.e., no atomic.wait)
        while let Ok(asset) = rx_assets.try_recv() {
            match asset {
                SceneAsset::Skybox(faces) => {
                    log!("run_skybox(): skybox ready");
                    skybox = Some(skybox_from_faces(&context, &faces));
                },
                SceneAsset::PanelTexture(_) => {},
                SceneAsset::Failed(e) => {
                    log!("run_skybox(): ERROR: {}", e);
                    set_error_for_egui(&warning_flag, &warning_msg, e);
                },
            }
        }

        if !pointer_over_gui {
            orbit_control.handle_events(&mut camera, &mut frame_input.events);
        }

        gui.update(
            &mut frame_input.events,
            frame_input.accumulated_time,
            frame_input.viewport,
            frame_input.device_pixel_ratio,
            |gui_context| {
                pointer_over_gui = gui_context.is_using_pointer();
                show_warnings(gui_context, &warning_flag, &warning_msg);
            },
        );

        let screen = frame_input.screen();
        screen.clear(ClearState::color_and_depth(0.1, 0.1, 0.12, 1.0, 1.0));
        if let Some(skybox) = &skybox {
            screen.render(&camera, skybox, &[&scene.light]);
        }
        gui.render();

        FrameOutput::default()
    });

    Ok(())
}


/// Table with lamp, panel and text, plus the camera flythrough
fn run_tabletop(settings: Settings) -> Result<(), String> {
    let warning_flag = Arc::new(AtomicBool::new(false));
    let warning_msg = Arc::new(Mutex::new(String::new()));

    let window = open_window("Tabletop flythrough")?;
    let context = window.gl();
    log!("run_tabletop(): OpenGL version: {:?}", context.version());

    // park the camera at the end of the flight until it is started
    let home = CameraPose::at_frame(LAST_FRAME);
    let mut camera = Camera::new_perspective(
        window.viewport(),
        home.position,
        home.target,
        vec3(0.0, 1.0, 0.0),
        degrees(settings.fov_degrees),
        0.1,
        1000.0,
    );
    let mut orbit_control = OrbitControl2::new(flight_target(), 1.0, 100.0);

    let mut scene = TabletopScene::new(&context, &settings.text);
    let mut skybox: Option<Skybox> = None;

    let (bus_assets, mut rx_assets) = asset_bus();
    load_skybox(settings.skybox_url.clone(), bus_assets.clone());
    if let Some(url) = settings.panel_url.clone() {
        load_panel_texture(url, bus_assets);
    }

    let mut animator = FlightAnimator::new();
    let mut gui = three_d::GUI::new(&context);
    let mut pointer_over_gui = false;
    let mut frame_prev = get_time_milliseconds();
    let mut fps_ma = IncrementalMA::new(100);

    window.render_loop(move |mut frame_input| {
        let now = get_time_milliseconds();
        let fps = fps_ma.add(1000.0 / (now - frame_prev));
        frame_prev = now;

        camera.set_viewport(frame_input.viewport);

        // non-blocking (i.e., no atomic.wait)
        while let Ok(asset) = rx_assets.try_recv() {
            match asset {
                SceneAsset::Skybox(faces) => {
                    log!("run_tabletop(): skybox ready");
                    skybox = Some(skybox_from_faces(&context, &faces));
                },
                SceneAsset::PanelTexture(texture) => {
                    log!("run_tabletop(): panel texture ready: {}x{}", texture.width, texture.height);
                    scene.set_panel_texture(&context, &texture);
                },
                SceneAsset::Failed(e) => {
                    log!("run_tabletop(): ERROR: {}", e);
                    set_error_for_egui(&warning_flag, &warning_msg, e);
                },
            }
        }

        // the flythrough owns the camera while it runs
        if !pointer_over_gui && !animator.is_running() {
            orbit_control.handle_events(&mut camera, &mut frame_input.events);
        }

        let cam_pos = *camera.position();
        gui.update(
            &mut frame_input.events,
            frame_input.accumulated_time,
            frame_input.viewport,
            frame_input.device_pixel_ratio,
            |gui_context| {
                pointer_over_gui = gui_context.is_using_pointer();

                egui::Window::new("Flythrough")
                    .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
                    .show(gui_context, |ui| {
                        ui.horizontal(|ui| {
                            if ui.button("Start").clicked() {
                                log!("run_tabletop(): start");
                                animator.start();
                            }
                            if ui.button("Stop").clicked() {
                                log!("run_tabletop(): stop requested at frame {}", animator.frame());
                                animator.request_stop();
                            }
                        });

                        egui::Grid::new("flythrough_grid")
                            .num_columns(2)
                            .spacing([40.0, 4.0])
                            .striped(true)
                            .show(ui, |ui| {
                                ui.add(egui::Label::new("State"));
                                ui.label(animator.state().label());
                                ui.end_row();

                                ui.add(egui::Label::new("Frame"));
                                ui.label(format!("{} / {}", animator.frame(), LAST_FRAME));
                                ui.end_row();

                                ui.add(egui::Label::new("FPS"));
                                ui.label(format!("{:.2}", fps));
                                ui.end_row();

                                ui.add(egui::Label::new("Camera Position"));
                                ui.label(format!("({:.2}, {:.2}, {:.2})", cam_pos.x, cam_pos.y, cam_pos.z));
                                ui.end_row();
                            });
                    });

                show_warnings(gui_context, &warning_flag, &warning_msg);
            },
        );

        let mut passes = TabletopPasses {
            screen: frame_input.screen(),
            skybox: skybox.as_ref(),
            scene: &scene,
        };
        if animator.is_running() {
            if !animator.tick(&mut camera, &mut passes) {
                log!("run_tabletop(): flythrough finished");
                orbit_control.set_target(flight_target());
            }
        } else {
            passes.render_primary(&camera);
            passes.render_overlay(&camera);
        }
        gui.render();

        FrameOutput::default()
    });

    Ok(())
}
