//! Players, their input and their manager.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use verdant_core::ToolDef;

use crate::action::TelescopeKind;
use crate::animation::AnimationId;
use crate::entity::{Body, EntityId, EntityRef};
use crate::inventory::Inventory;
use crate::storage::ChunkStore;

/// Sprite sheet of every player.
pub const PLAYER_SHEET: &str = "player";

/// Player collision radius in world units.
pub const PLAYER_HIT_RADIUS: f64 = 10.0;

/// What the primary button does outside placement mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimaryBinding {
    /// Weapon, tools and farming through the multi-tool.
    #[default]
    MultiTool,
    /// Fire the named projectile.
    Projectile(String),
}

/// Active building-placement mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementMode {
    /// Building definition id.
    pub building: String,
}

/// Placement selection change requested by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementInput {
    #[default]
    Keep,
    Select(String),
    Clear,
}

/// Polled input state for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Cursor position in world units.
    pub cursor: DVec2,
    /// Primary button went down this tick.
    pub primary_pressed: bool,
    /// The pointer is over a UI element; world clicks are ignored.
    pub pointer_over_ui: bool,
    pub placement: PlacementInput,
    pub binding: Option<PrimaryBinding>,
}

impl PlayerInput {
    /// Normalized movement vector from the direction keys (screen space, y down).
    pub fn movement(&self) -> DVec2 {
        let mut v = DVec2::ZERO;
        if self.up {
            v.y -= 1.0;
        }
        if self.down {
            v.y += 1.0;
        }
        if self.left {
            v.x -= 1.0;
        }
        if self.right {
            v.x += 1.0;
        }
        v.normalize_or_zero()
    }

    /// Whether a world click should reach the action system.
    pub fn world_click(&self) -> bool {
        self.primary_pressed && !self.pointer_over_ui
    }
}

/// A player character.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: EntityId,
    pub body: Body,
    pub inventory: Inventory,
    /// Multi-tool stats.
    pub tool: ToolDef,
    pub placement: Option<PlacementMode>,
    pub binding: PrimaryBinding,
    pub speed: f64,
    pub hp: f64,
    pub max_hp: f64,
    /// Kind of the last telescope, for the cursor icon.
    pub cursor_hint: TelescopeKind,
    pub spawn_point: DVec2,
    /// One-shot action animation currently playing.
    pub action: Option<AnimationId>,
}

impl Player {
    pub fn new(id: EntityId, position: DVec2, tool: ToolDef, speed: f64, hp: f64) -> Self {
        Self {
            id,
            body: Body::new(position, PLAYER_HIT_RADIUS).with_hitbox_offset(DVec2::new(0.0, -4.0)),
            inventory: Inventory::new(),
            tool,
            placement: None,
            binding: PrimaryBinding::default(),
            speed,
            hp,
            max_hp: hp,
            cursor_hint: TelescopeKind::None,
            spawn_point: position,
            action: None,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Player(self.id)
    }

    /// Apply selection changes from the input.
    pub fn apply_selection(&mut self, input: &PlayerInput) {
        match &input.placement {
            PlacementInput::Keep => {}
            PlacementInput::Select(building) => {
                self.placement = Some(PlacementMode {
                    building: building.clone(),
                })
            }
            PlacementInput::Clear => self.placement = None,
        }
        if let Some(binding) = &input.binding {
            self.binding = binding.clone();
        }
    }

    /// Walk from input plus knockback. Returns false when the move was blocked.
    pub fn step(&mut self, store: &mut ChunkStore, input: Option<&PlayerInput>) -> bool {
        let walk = input.map_or(DVec2::ZERO, |i| i.movement() * self.speed);
        if walk != DVec2::ZERO {
            self.body.face(walk);
        }
        let step = walk + self.body.take_force_step();
        self.body.slide(store, step)
    }

    /// Subtract hit points. Returns true when the player was defeated, in
    /// which case they are restored at their spawn point.
    pub fn take_damage(&mut self, amount: f64) -> bool {
        self.hp -= amount;
        if self.hp > 0.0 {
            return false;
        }
        self.hp = self.max_hp;
        self.body.set_position(self.spawn_point);
        true
    }
}

/// Owns every player; one of them receives input.
#[derive(Debug, Default)]
pub struct PlayerManager {
    players: Vec<Player>,
    active: Option<EntityId>,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player; the first one added becomes active.
    pub fn add(&mut self, player: Player) {
        if self.active.is_none() {
            self.active = Some(player.id);
        }
        self.players.push(player);
    }

    pub fn set_active(&mut self, id: EntityId) {
        if self.get(id).is_some() {
            self.active = Some(id);
        }
    }

    pub fn active_id(&self) -> Option<EntityId> {
        self.active
    }

    pub fn active(&self) -> Option<&Player> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut Player> {
        let id = self.active?;
        self.get_mut(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Move every player: the active one from input, the rest only by knockback.
    pub fn update_movement(&mut self, store: &mut ChunkStore, input: &PlayerInput) {
        let active = self.active;
        for player in &mut self.players {
            let input = (Some(player.id) == active).then_some(input);
            player.step(store, input);
        }
    }

    /// Remove flagged players.
    pub fn sweep(&mut self) -> Vec<EntityRef> {
        let mut removed = Vec::new();
        self.players.retain(|p| {
            if p.body.is_despawned() {
                removed.push(p.entity_ref());
                false
            } else {
                true
            }
        });
        if self.active.is_some_and(|id| !self.players.iter().any(|p| p.id == id)) {
            self.active = self.players.first().map(|p| p.id);
        }
        removed
    }
}
