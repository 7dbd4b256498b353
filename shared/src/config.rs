/// Pitch geometry. Invariant for the lifetime of a match.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub width: f64,
    pub length: f64,
    pub goal_width: f64,
    pub goal_height: f64,
    pub goal_depth: f64,
    pub ball_radius: f64,
    /// Collision radius of each goalpost
    pub post_radius: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: 60.0,
            length: 90.0,
            goal_width: 10.0,
            goal_height: 3.0,
            goal_depth: 2.5,
            ball_radius: 0.35,
            post_radius: 0.2,
        }
    }
}

impl FieldConfig {
    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    pub fn half_length(&self) -> f64 {
        self.length / 2.0
    }
}

/// Ball physics constants.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PhysicsConfig {
    /// Velocity retained per 60 Hz frame
    pub friction: f64,
    pub gravity: f64,
    /// Fraction of vertical speed kept on a bounce
    pub bounce: f64,
    /// Vertical impact speed below which the ball settles instead of bouncing
    pub bounce_threshold: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            friction: 0.975,
            gravity: 9.8,
            bounce: 0.6,
            bounce_threshold: 1.0,
        }
    }
}

/// Kicking, dribbling and movement tuning.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct GameplayConfig {
    pub shoot_power_max: f64,
    pub pass_power: f64,
    pub through_power: f64,
    pub dribble_force: f64,
    pub dribble_max_speed: f64,
    /// Distance within which a player controls the ball
    pub control_distance: f64,
    pub kickoff_distance: f64,
    pub tackle_distance: f64,
    pub run_speed: f64,
    pub sprint_speed: f64,
    /// Charge gained per second while shoot is held
    pub charge_rate: f64,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            shoot_power_max: 35.0,
            pass_power: 18.0,
            through_power: 22.0,
            dribble_force: 12.0,
            dribble_max_speed: 12.0,
            control_distance: 1.5,
            kickoff_distance: 2.0,
            tackle_distance: 2.0,
            run_speed: 7.0,
            sprint_speed: 12.0,
            charge_rate: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct StaminaConfig {
    pub max: f64,
    /// Drained per second of sprinting
    pub drain: f64,
    /// Regained per second otherwise
    pub regen: f64,
}

impl Default for StaminaConfig {
    fn default() -> Self {
        Self {
            max: 100.0,
            drain: 10.0,
            regen: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct AnimationConfig {
    pub jump_height: f64,
    pub jump_duration: f64,
    pub dive_duration: f64,
    pub throw_duration: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            jump_height: 1.2,
            jump_duration: 0.8,
            dive_duration: 1.0,
            throw_duration: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Match,
    Training,
}

/// Training sub-mode picked in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum TrainingKind {
    Free,
    SetPiece,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    Broadcast,
    TopDown,
    Dynamic,
    FirstPerson,
}

/// Rendering-only tag. Physics ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Clear,
    Rain,
    Snow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Day,
    Night,
}

/// Preset five-a-side layouts. Slot 0 is always the goalkeeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub enum Formation {
    #[serde(rename = "1-2-1")]
    OneTwoOne,
    #[serde(rename = "2-2")]
    TwoTwo,
    #[serde(rename = "1-1-2")]
    OneOneTwo,
}

impl Formation {
    /// Home-side slots as (x, z). Away mirrors z.
    pub fn slots(self) -> Vec<[f64; 2]> {
        match self {
            Formation::OneTwoOne => vec![[0.0, 48.0], [-15.0, 20.0], [15.0, 20.0], [0.0, 5.0], [0.0, -10.0]],
            Formation::TwoTwo => vec![[0.0, 48.0], [-12.0, 25.0], [12.0, 25.0], [-10.0, -5.0], [10.0, -5.0]],
            Formation::OneOneTwo => vec![[0.0, 48.0], [0.0, 25.0], [0.0, 5.0], [-12.0, -15.0], [12.0, -15.0]],
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct TeamProfile {
    pub id: String,
    pub name: String,
    /// 0xRRGGBB kit colour
    pub color: u32,
    pub attack: u32,
    pub midfield: u32,
    pub defense: u32,
    pub roster: Vec<String>,
}

impl TeamProfile {
    fn preset(id: &str, name: &str, color: u32, ratings: [u32; 3], roster: [&str; 5]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color,
            attack: ratings[0],
            midfield: ratings[1],
            defense: ratings[2],
            roster: roster.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Selectable national sides.
pub fn team_presets() -> Vec<TeamProfile> {
    vec![
        TeamProfile::preset("brazil", "Brazil", 0xffe100, [87, 85, 83], ["Ederson", "Marquinhos", "Casemiro", "Vinicius", "Neymar"]),
        TeamProfile::preset("argentina", "Argentina", 0x75aadb, [88, 84, 82], ["Martinez", "Romero", "De Paul", "Messi", "Alvarez"]),
        TeamProfile::preset("france", "France", 0x002395, [89, 86, 84], ["Maignan", "Saliba", "Tchouameni", "Griezmann", "Mbappé"]),
        TeamProfile::preset("germany", "Germany", 0xffffff, [84, 87, 85], ["Neuer", "Rudiger", "Kimmich", "Musiala", "Havertz"]),
        TeamProfile::preset("spain", "Spain", 0xaa151b, [83, 88, 84], ["Simon", "Laporte", "Rodri", "Pedri", "Morata"]),
        TeamProfile::preset("custom", "Custom Utd", 0xc8102e, [80, 80, 80], ["Keeper", "Defender", "Mid", "Winger", "Striker"]),
    ]
}

/// Menu choices sent by the client when starting a match.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MatchSettings {
    pub mode: GameMode,
    pub training: TrainingKind,
    pub formation: Formation,
    /// Index into `team_presets()`
    pub home_team: usize,
    pub away_team: usize,
    pub weather: Weather,
    pub time_of_day: TimeOfDay,
    pub game_speed: f64,
    pub ai_difficulty: f64,
    pub camera_mode: CameraMode,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            mode: GameMode::Match,
            training: TrainingKind::Free,
            formation: Formation::OneTwoOne,
            home_team: 0,
            away_team: 2,
            weather: Weather::Clear,
            time_of_day: TimeOfDay::Day,
            game_speed: 1.0,
            ai_difficulty: 1.0,
            camera_mode: CameraMode::Broadcast,
        }
    }
}

/// Everything a match session reads at start. Never mutated afterwards.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    pub field: FieldConfig,
    pub physics: PhysicsConfig,
    pub gameplay: GameplayConfig,
    pub stamina: StaminaConfig,
    pub animation: AnimationConfig,
    pub ai_difficulty: f64,
    pub game_speed: f64,
    /// Home-side roster slots as (x, z); slot 0 is the goalkeeper
    pub formation: Vec<[f64; 2]>,
    pub home_team: TeamProfile,
    pub away_team: TeamProfile,
    pub mode: GameMode,
    pub training: TrainingKind,
    pub camera_mode: CameraMode,
    pub weather: Weather,
    pub time_of_day: TimeOfDay,
    /// Match clock in seconds
    pub match_duration: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        let teams = team_presets();
        Self {
            field: FieldConfig::default(),
            physics: PhysicsConfig::default(),
            gameplay: GameplayConfig::default(),
            stamina: StaminaConfig::default(),
            animation: AnimationConfig::default(),
            ai_difficulty: 1.0,
            game_speed: 1.0,
            formation: Formation::OneTwoOne.slots(),
            home_team: teams[0].clone(),
            away_team: teams[2].clone(),
            mode: GameMode::Match,
            training: TrainingKind::Free,
            camera_mode: CameraMode::Broadcast,
            weather: Weather::Clear,
            time_of_day: TimeOfDay::Day,
            match_duration: 300.0,
        }
    }
}

impl MatchConfig {
    /// Apply menu settings over the defaults.
    pub fn from_settings(settings: &MatchSettings) -> Result<Self, String> {
        let teams = team_presets();
        let home_team = teams
            .get(settings.home_team)
            .cloned()
            .ok_or_else(|| format!("unknown home team index {}", settings.home_team))?;
        let away_team = teams
            .get(settings.away_team)
            .cloned()
            .ok_or_else(|| format!("unknown away team index {}", settings.away_team))?;

        let config = Self {
            ai_difficulty: settings.ai_difficulty,
            game_speed: settings.game_speed,
            formation: settings.formation.slots(),
            home_team,
            away_team,
            mode: settings.mode,
            training: settings.training,
            camera_mode: settings.camera_mode,
            weather: settings.weather,
            time_of_day: settings.time_of_day,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let f = &self.field;
        for (name, v) in [
            ("field.width", f.width),
            ("field.length", f.length),
            ("field.goal_width", f.goal_width),
            ("field.goal_height", f.goal_height),
            ("field.goal_depth", f.goal_depth),
            ("field.ball_radius", f.ball_radius),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(format!("{} must be finite and > 0", name));
            }
        }
        if f.goal_width >= f.width {
            return Err("field.goal_width must be narrower than the pitch".to_string());
        }
        if !(0.0..=1.0).contains(&self.physics.friction) {
            return Err("physics.friction must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.physics.bounce) {
            return Err("physics.bounce must be in [0, 1]".to_string());
        }
        if !self.game_speed.is_finite() || self.game_speed <= 0.0 {
            return Err("game_speed must be finite and > 0".to_string());
        }
        if !self.ai_difficulty.is_finite() || self.ai_difficulty < 0.0 {
            return Err("ai_difficulty must be finite and >= 0".to_string());
        }
        if self.stamina.max <= 0.0 {
            return Err("stamina.max must be > 0".to_string());
        }
        if self.formation.len() < 2 {
            return Err("formation needs a goalkeeper and at least one outfield slot".to_string());
        }
        if self.match_duration <= 0.0 {
            return Err("match_duration must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_match_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_game_speed_invalid() {
        let config = MatchConfig {
            game_speed: 0.0,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn goal_wider_than_pitch_invalid() {
        let mut config = MatchConfig::default();
        config.field.goal_width = 80.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn settings_pick_teams_and_formation() {
        let settings = MatchSettings {
            home_team: 1,
            away_team: 3,
            formation: Formation::TwoTwo,
            ..MatchSettings::default()
        };
        let config = MatchConfig::from_settings(&settings).unwrap();
        assert_eq!(config.home_team.id, "argentina");
        assert_eq!(config.away_team.id, "germany");
        assert_eq!(config.formation, Formation::TwoTwo.slots());
    }

    #[test]
    fn unknown_team_index_rejected() {
        let settings = MatchSettings {
            away_team: 42,
            ..MatchSettings::default()
        };
        assert!(MatchConfig::from_settings(&settings).is_err());
    }

    #[test]
    fn every_formation_starts_with_keeper_slot() {
        for formation in [Formation::OneTwoOne, Formation::TwoTwo, Formation::OneOneTwo] {
            let slots = formation.slots();
            assert_eq!(slots.len(), 5);
            assert_eq!(slots[0], [0.0, 48.0]);
        }
    }

    #[test]
    fn settings_deserialize_from_menu_json() {
        let json = r#"{
            "mode": "training", "training": "setpiece", "formation": "2-2",
            "homeTeam": 0, "awayTeam": 1, "weather": "rain", "timeOfDay": "night",
            "gameSpeed": 1.5, "aiDifficulty": 2.0, "cameraMode": "firstperson"
        }"#;
        let settings: MatchSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.mode, GameMode::Training);
        assert_eq!(settings.training, TrainingKind::SetPiece);
        assert_eq!(settings.formation, Formation::TwoTwo);
        assert_eq!(settings.camera_mode, CameraMode::FirstPerson);
    }
}
