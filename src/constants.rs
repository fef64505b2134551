// Physical constants (SI unless the name says otherwise)
pub const STEFAN_BOLTZMANN: f64 = 5.670374419e-8; // W m^-2 K^-4
pub const GRAVITATIONAL_CONSTANT: f64 = 6.6743e-11; // m^3 kg^-1 s^-2
pub const GAS_CONSTANT: f64 = 8.314462618; // J mol^-1 K^-1
pub const AU_M: f64 = 1.495978707e11;
pub const TO_KELVIN: f64 = 273.15;

// Reference bodies
pub const SOLAR_LUMINOSITY_W: f64 = 3.828e26;
pub const SOLAR_MASS_KG: f64 = 1.98847e30;
pub const SOLAR_TEMPERATURE_K: f64 = 5772.0;
pub const EARTH_MASS_KG: f64 = 5.97e24;
pub const EARTH_RADIUS_M: f64 = 6.371e6;
pub const EARTH_GRAVITY_MS2: f64 = 9.807;
pub const EARTH_PRESSURE_KPA: f64 = 101.325;
pub const EARTH_AVERAGE_TEMP_K: f64 = 289.0;
pub const EARTH_ROTATION_S: f64 = 86_164.0;
pub const EARTH_AXIAL_TILT_DEG: f64 = 23.44;
pub const EARTH_ECCENTRICITY: f64 = 0.0167;
pub const EARTH_WATER_COVERAGE: f64 = 0.71;
pub const JUPITER_MASS_KG: f64 = 1.898e27;

// Convergence budget
pub const CONVERGENCE_TOLERANCE_K: f64 = 0.5;
pub const MAX_CONVERGENCE_PASSES: usize = 10;
pub const EQUILIBRATION_TOLERANCE_K: f64 = 5.0;
pub const MAX_EQUILIBRATION_PASSES: usize = 10;

// Atmosphere bookkeeping
pub const CLOSURE_EPSILON: f64 = 1e-4;
pub const HUMIDITY_THRESHOLD: f64 = 0.01; // fraction of saturation that triggers carbonate weathering
pub const TRACE_CO2_FRACTION: f64 = 4e-4;
pub const MAX_EVAPORATION_PER_PASS: f64 = 0.25; // fraction of a reservoir released per pass
pub const MAX_BREATHABLE_O2_FRACTION: f64 = 0.21;

// Hydrosphere
pub const NO_WATER_SEA_LEVEL_FACTOR: f64 = -1.1;
pub const WATER_DENSITY_KGM3: f64 = 1000.0;
pub const ICE_DENSITY_KGM3: f64 = 917.0;
pub const ICE_CONDUCTIVITY_W_M_K: f64 = 2.2;
pub const FREEZING_POINT_K: f64 = TO_KELVIN;

// Climate
pub const LAPSE_RATE_K_PER_M: f64 = 0.0065; // at Earth gravity
pub const HEAT_TRANSPORT_PRESSURE_KPA: f64 = 200.0;
pub const SEASON_DECLINATION_SAMPLES: usize = 24;

// Raster encoding
pub const MAX_ENCODED_TEMP_K: f64 = 2000.0;
