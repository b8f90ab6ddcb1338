use std::f32::consts::PI;
use three_d::*;


/// Last value of the frame counter; the tick that renders it ends the flight
pub const LAST_FRAME: u16 = 500;
/// Frame the counter jumps to when a stop is requested
pub const STOP_FRAME: u16 = LAST_FRAME - 1;
/// Frame at which the circular climb hands over to the dolly-in
pub const PHASE_SPLIT: u16 = 250;

const ORBIT_RADIUS: f32 = 16.0;
const CLIMB_START: f32 = 3.0;
const CLIMB_HEIGHT: f32 = 3.0;
const DOLLY_HEIGHT: f32 = 6.0;
const DOLLY_START_Z: f32 = 24.0;
const DOLLY_DISTANCE: f32 = 13.5;


/// Point the camera looks at during the whole flight
pub fn flight_target() -> Vec3 {
    vec3(0.0, 3.0, -4.0)
}


/// Camera position and look-at target for one frame of the flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}
impl CameraPose {
    /// Evaluates the flight path at `frame` (clamped to [0, LAST_FRAME])
    pub fn at_frame(frame: u16) -> Self {
        let frame = frame.min(LAST_FRAME);
        let position = if frame <= PHASE_SPLIT {
            // half circle around the origin while climbing
            let t = frame as f32 / PHASE_SPLIT as f32;
            let angle = t*PI;
            vec3(
                ORBIT_RADIUS*angle.sin(),
                CLIMB_START + CLIMB_HEIGHT*t,
                -ORBIT_RADIUS*angle.cos(),
            )
        } else {
            // straight dolly towards the table
            let t = (frame - PHASE_SPLIT) as f32 / (LAST_FRAME - PHASE_SPLIT) as f32;
            vec3(0.0, DOLLY_HEIGHT, DOLLY_START_Z - DOLLY_DISTANCE*t)
        };

        Self {
            position,
            target: flight_target(),
        }
    }
}


/// Anything the animator can point along the flight path
pub trait FlightCamera {
    fn apply_pose(&mut self, pose: &CameraPose);
}

impl FlightCamera for Camera {
    fn apply_pose(&mut self, pose: &CameraPose) {
        self.set_view(pose.position, pose.target, vec3(0.0, 1.0, 0.0));
    }
}


/// The two render passes issued on every tick, in this order
pub trait FlightRenderer<C> {
    /// Renders the 3D scene
    fn render_primary(&mut self, camera: &C);
    /// Composites the planar embedded content on top of the primary pass
    fn render_overlay(&mut self, camera: &C);
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    /// Armed but never started
    Idle,
    Running,
    /// A stop was requested; the terminal frame is at most two ticks away
    Stopping,
    Stopped,
}
impl FlightState {
    pub fn label(&self) -> &'static str {
        match self {
            FlightState::Idle => "Idle",
            FlightState::Running => "Running",
            FlightState::Stopping => "Stopping",
            FlightState::Stopped => "Stopped",
        }
    }
}


/// Frame-indexed camera flythrough with cooperative start/stop control
#[derive(Debug)]
pub struct FlightAnimator {
    frame: u16,
    state: FlightState,
}
impl Default for FlightAnimator {
    fn default() -> Self {
        Self::new()
    }
}
impl FlightAnimator {
    pub fn new() -> Self {
        Self {
            frame: 0,
            state: FlightState::Idle,
        }
    }

    pub fn frame(&self) -> u16 {
        self.frame
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, FlightState::Running | FlightState::Stopping)
    }

    /// (Re)starts the flight from the first frame, discarding any progress
    pub fn start(&mut self) {
        self.frame = 0;
        self.state = FlightState::Running;
    }

    /// Jumps forward to the frame before the last one so that the flight
    /// finishes on the terminal pose instead of being cut off
    pub fn request_stop(&mut self) {
        self.frame = self.frame.max(STOP_FRAME);
        if self.state == FlightState::Running {
            self.state = FlightState::Stopping;
        }
    }

    /// Advances the flight by one frame.
    /// Returns true if another tick should be scheduled.
    pub fn tick<C, R>(&mut self, camera: &mut C, renderer: &mut R) -> bool
    where
        C: FlightCamera,
        R: FlightRenderer<C>,
    {
        if !self.is_running() {
            return false;
        }

        let rendered = self.frame;
        camera.apply_pose(&CameraPose::at_frame(rendered));

        renderer.render_primary(camera);
        renderer.render_overlay(camera);

        self.frame = (rendered + 1) % (LAST_FRAME + 1);
        if rendered == LAST_FRAME {
            self.state = FlightState::Stopped;
        }

        self.is_running()
    }

    /// Steps the flight until it halts, returning the number of ticks taken.
    /// Does nothing unless the flight has been started.
    #[cfg(test)]
    pub fn run_to_end<C, R>(&mut self, camera: &mut C, renderer: &mut R) -> usize
    where
        C: FlightCamera,
        R: FlightRenderer<C>,
    {
        let mut ticks = 0;
        let mut scheduled = self.is_running();
        while scheduled {
            scheduled = self.tick(camera, renderer);
            ticks += 1;
        }
        ticks
    }
}
