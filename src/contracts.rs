//! Pool Contract Definitions
//!
//! The default schema the monitor runs with: the Uniswap V3 pool events,
//! plus the `secondsInside` view function the monitor shipped with before
//! the event layout was known. The JSON is loaded at runtime by the
//! SchemaRegistry; the `sol!` bindings give typed encoders for the same
//! events.

use alloy::sol;

/// Uniswap V3 pool ABI (events + the `secondsInside` view)
pub const UNISWAP_V3_POOL_ABI: &str = r#"[
  {"anonymous":false,"type":"event","name":"Initialize","inputs":[
    {"indexed":false,"name":"sqrtPriceX96","type":"uint160"},
    {"indexed":false,"name":"tick","type":"int24"}]},
  {"anonymous":false,"type":"event","name":"Mint","inputs":[
    {"indexed":false,"name":"sender","type":"address"},
    {"indexed":true,"name":"owner","type":"address"},
    {"indexed":true,"name":"tickLower","type":"int24"},
    {"indexed":true,"name":"tickUpper","type":"int24"},
    {"indexed":false,"name":"amount","type":"uint128"},
    {"indexed":false,"name":"amount0","type":"uint256"},
    {"indexed":false,"name":"amount1","type":"uint256"}]},
  {"anonymous":false,"type":"event","name":"Collect","inputs":[
    {"indexed":true,"name":"owner","type":"address"},
    {"indexed":false,"name":"recipient","type":"address"},
    {"indexed":true,"name":"tickLower","type":"int24"},
    {"indexed":true,"name":"tickUpper","type":"int24"},
    {"indexed":false,"name":"amount0","type":"uint128"},
    {"indexed":false,"name":"amount1","type":"uint128"}]},
  {"anonymous":false,"type":"event","name":"Burn","inputs":[
    {"indexed":true,"name":"owner","type":"address"},
    {"indexed":true,"name":"tickLower","type":"int24"},
    {"indexed":true,"name":"tickUpper","type":"int24"},
    {"indexed":false,"name":"amount","type":"uint128"},
    {"indexed":false,"name":"amount0","type":"uint256"},
    {"indexed":false,"name":"amount1","type":"uint256"}]},
  {"anonymous":false,"type":"event","name":"Swap","inputs":[
    {"indexed":true,"name":"sender","type":"address"},
    {"indexed":true,"name":"recipient","type":"address"},
    {"indexed":false,"name":"amount0","type":"int256"},
    {"indexed":false,"name":"amount1","type":"int256"},
    {"indexed":false,"name":"sqrtPriceX96","type":"uint160"},
    {"indexed":false,"name":"liquidity","type":"uint128"},
    {"indexed":false,"name":"tick","type":"int24"}]},
  {"anonymous":false,"type":"event","name":"Flash","inputs":[
    {"indexed":true,"name":"sender","type":"address"},
    {"indexed":true,"name":"recipient","type":"address"},
    {"indexed":false,"name":"amount0","type":"uint256"},
    {"indexed":false,"name":"amount1","type":"uint256"},
    {"indexed":false,"name":"paid0","type":"uint256"},
    {"indexed":false,"name":"paid1","type":"uint256"}]},
  {"constant":true,"inputs":[{"name":"tick","type":"int24"}],"name":"secondsInside",
   "outputs":[{"name":"","type":"uint32"}],"payable":false,"stateMutability":"view","type":"function"}
]"#;

/// Default event to monitor
pub const DEFAULT_EVENT: &str = "Swap";

// ── Uniswap V3 pool events ─────────────────────────────────────────

sol! {
    interface IUniswapV3PoolEvents {
        event Initialize(uint160 sqrtPriceX96, int24 tick);
        event Mint(address sender, address indexed owner, int24 indexed tickLower, int24 indexed tickUpper, uint128 amount, uint256 amount0, uint256 amount1);
        event Burn(address indexed owner, int24 indexed tickLower, int24 indexed tickUpper, uint128 amount, uint256 amount0, uint256 amount1);
        event Swap(address indexed sender, address indexed recipient, int256 amount0, int256 amount1, uint160 sqrtPriceX96, uint128 liquidity, int24 tick);
    }
}
