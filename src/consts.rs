/// Wrapped SOL mint; the base asset every trade is quoted against
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";

pub const RAYDIUM_SWAP_HOST: &str = "https://transaction-v1.raydium.io";
pub const RAYDIUM_API_HOST: &str = "https://api-v3.raydium.io";
pub const RAYDIUM_PRIORITY_FEE_PATH: &str = "/main/auto-fee";

pub const JITO_BUNDLE_URL: &str = "https://ny.mainnet.block-engine.jito.wtf/api/v1/bundles";

/// Block engines refuse bundles longer than this
pub const MAX_BUNDLE_TRANSACTIONS: usize = 5;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Prices are reported with this many decimal places
pub const PRICE_DECIMALS: u32 = 8;

/// Relative tolerance for threshold comparisons on prices
pub const EPSILON: f64 = 1e-9;
