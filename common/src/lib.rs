pub mod tracer;

pub type Redshift = f64;
pub type Degrees = f64;
pub type Arcminutes = f64;
pub type Milliseconds = f64;
pub type Megahertz = f64;
pub type Kelvin = f64;
pub type Jansky = f64;
/// Dispersion measure in pc cm^-3.
pub type DispersionMeasure = f64;
/// Distance in megaparsec.
pub type Megaparsec = f64;

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
pub const METRES_PER_MEGAPARSEC: f64 = 3.085_677_581_491_367e22;
pub const WATTS_PER_ERG_PER_SECOND: f64 = 1e-7;
/// One jansky in W m^-2 Hz^-1.
pub const JANSKY_SI: f64 = 1e-26;
pub const HZ_PER_MHZ: f64 = 1e6;
pub const SECONDS_PER_MS: f64 = 1e-3;
pub const ARCMIN_PER_DEGREE: f64 = 60.0;
/// Intra-channel dispersion smearing constant, giving milliseconds when
/// channel width and centre frequency are in MHz.
pub const DISPERSION_SMEARING_MS: f64 = 8.297_616e6;
