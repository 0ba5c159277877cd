use glam::DVec2;
use serde::Deserialize;
use std::{fs, path::Path};
use verdant_world::{PlacementInput, PlayerInput, PrimaryBinding};

#[derive(Debug, Deserialize)]
struct ScriptedInputFile {
    steps: Vec<ScriptedStep>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ScriptedStep {
    /// Ticks the step is held.
    ticks: u64,
    #[serde(default)]
    up: bool,
    #[serde(default)]
    down: bool,
    #[serde(default)]
    left: bool,
    #[serde(default)]
    right: bool,
    /// Cursor offset from the player's position.
    #[serde(default)]
    aim: [f64; 2],
    /// Press the primary button on the step's first tick.
    #[serde(default)]
    click: bool,
    #[serde(default)]
    place: Option<String>,
    #[serde(default)]
    stop_placing: bool,
    #[serde(default)]
    projectile: Option<String>,
    #[serde(default)]
    multi_tool: bool,
}

/// Replays a list of held inputs, looping back to the start when done.
pub struct ScriptedInputPlayer {
    steps: Vec<ScriptedStep>,
    index: usize,
    tick_in_step: u64,
}

impl ScriptedInputPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: ScriptedInputFile = serde_json::from_str(json)?;
        if file.steps.is_empty() {
            anyhow::bail!("scripted input file contains no steps");
        }
        Ok(Self {
            steps: file.steps,
            index: 0,
            tick_in_step: 0,
        })
    }

    /// A short patrol: wander around, swing at whatever is ahead, fence a
    /// tile and loose an arrow.
    pub fn patrol() -> Self {
        let step = |ticks, f: fn(&mut ScriptedStep)| {
            let mut step = ScriptedStep {
                ticks,
                ..ScriptedStep::default()
            };
            f(&mut step);
            step
        };
        Self {
            steps: vec![
                step(90, |s| s.right = true),
                step(30, |s| {
                    s.aim = [48.0, 0.0];
                    s.click = true;
                }),
                step(60, |s| s.down = true),
                step(30, |s| {
                    s.aim = [0.0, 48.0];
                    s.click = true;
                }),
                step(40, |s| {
                    s.place = Some("fence".into());
                    s.aim = [64.0, 0.0];
                    s.click = true;
                }),
                step(10, |s| s.stop_placing = true),
                step(40, |s| {
                    s.projectile = Some("arrow".into());
                    s.aim = [0.0, -160.0];
                    s.click = true;
                }),
                step(10, |s| s.multi_tool = true),
                step(90, |s| s.left = true),
                step(60, |s| s.up = true),
            ],
            index: 0,
            tick_in_step: 0,
        }
    }

    /// Input for the next tick; `player` is the active player's position.
    pub fn advance(&mut self, player: DVec2) -> PlayerInput {
        let first_tick = self.tick_in_step == 0;
        let step = self.steps[self.index].clone();

        self.tick_in_step += 1;
        if self.tick_in_step >= step.ticks.max(1) {
            self.tick_in_step = 0;
            self.index = (self.index + 1) % self.steps.len();
        }

        step.into_input(player, first_tick)
    }
}

impl ScriptedStep {
    fn into_input(self, player: DVec2, first_tick: bool) -> PlayerInput {
        let placement = match (self.place, self.stop_placing) {
            (_, true) => PlacementInput::Clear,
            (Some(building), false) => PlacementInput::Select(building),
            (None, false) => PlacementInput::Keep,
        };
        let binding = match (self.projectile, self.multi_tool) {
            (_, true) => Some(PrimaryBinding::MultiTool),
            (Some(projectile), false) => Some(PrimaryBinding::Projectile(projectile)),
            (None, false) => None,
        };
        PlayerInput {
            up: self.up,
            down: self.down,
            left: self.left,
            right: self.right,
            cursor: player + DVec2::from(self.aim),
            primary_pressed: self.click && first_tick,
            pointer_over_ui: false,
            placement,
            binding,
        }
    }
}
