/// Gameplay tuning for the arena.
///
/// Keep this separate from the settings the operator supplies (arena size,
/// tick length, cooldowns). Distances are in world units, speeds in units
/// per tick.

#[derive(Debug, Clone, Copy)]
pub struct ArenaTuning {
    /// Distance a tank covers in one tick of movement.
    pub tank_speed: f64,

    /// Distance a projectile covers in one tick.
    pub projectile_speed: f64,

    /// Margin around a wall segment that a tank centre may not enter.
    pub tank_wall_margin: f64,

    /// Margin around a wall segment that destroys a projectile.
    pub projectile_wall_margin: f64,

    /// Margin around a wall segment kept free when placing a power-up.
    pub powerup_wall_margin: f64,

    /// Half width of a tank's hit box for projectile impacts.
    pub tank_half_width: f64,

    /// Radius of a tank as seen by the beam's ray test.
    pub beam_target_radius: f64,

    /// Half width of the box around a tank that picks up power-ups.
    pub pickup_half_width: f64,

    /// Live power-ups allowed at once.
    pub max_powerups: usize,

    /// Random samples tried before placement gives up on finding a clear spot.
    pub placement_attempts: usize,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            tank_speed: 3.0,
            projectile_speed: 25.0,
            tank_wall_margin: 55.0,
            projectile_wall_margin: 30.0,
            powerup_wall_margin: 35.0,
            tank_half_width: 30.0,
            beam_target_radius: 30.0,
            pickup_half_width: 35.0,
            max_powerups: 2,
            placement_attempts: 1000,
        }
    }
}
