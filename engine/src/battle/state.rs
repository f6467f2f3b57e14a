use serde::{Deserialize, Serialize};

/// Top-level flow states. Ordinals are significant: see [`BattleState::players_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BattleState {
    None = 0,
    IntroduceBattle = 1,
    NotInBattle = 2,
    FinishTurn = 3,
    EnemyMovingToTarget = 4,
    EnemyAttack = 5,
    EnemyMovingBackToBase = 6,
    PlayerNavigatingMenus = 7,
    PlayerMovingToTarget = 8,
    PlayerAttack = 9,
    PlayerMovingBackToBase = 10,
}

/// First ordinal that counts as a player state.
pub const PLAYER_STATE_BOUNDARY: u8 = BattleState::PlayerNavigatingMenus as u8;

impl BattleState {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Player states are every ordinal at or above [`PLAYER_STATE_BOUNDARY`].
    pub fn players_turn(self) -> bool {
        self.ordinal() >= PLAYER_STATE_BOUNDARY
    }

    pub fn enemys_turn(self) -> bool {
        matches!(
            self,
            BattleState::EnemyMovingToTarget
                | BattleState::EnemyAttack
                | BattleState::EnemyMovingBackToBase
        )
    }
}

/// Menu sub-state, only meaningful while the player is navigating menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuState {
    None,
    MainMenu,
    ItemsMenuInventory,
    ItemsMenuAttacks,
    ItemsMenuSkills,
    SelectTarget,
}

impl MenuState {
    pub fn title(self) -> &'static str {
        match self {
            MenuState::None => "",
            MenuState::MainMenu => "Main",
            MenuState::ItemsMenuInventory => "Inventory",
            MenuState::ItemsMenuAttacks => "Attacks",
            MenuState::ItemsMenuSkills => "Skills",
            MenuState::SelectTarget => "Select Target",
        }
    }
}
