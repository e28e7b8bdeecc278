use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instrument description as reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub con_id: i32,
    pub symbol: String,
    pub sec_type: String,
    pub last_trade_date_or_contract_month: String,
    pub strike: f64,
    pub right: String,
    pub multiplier: String,
    pub exchange: String,
    pub primary_exch: String,
    pub currency: String,
    pub local_symbol: String,
    pub trading_class: String,
    pub combo_legs_descrip: String,
    pub combo_legs: Vec<ComboLeg>,
    pub delta_neutral_contract: Option<DeltaNeutralContract>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboLeg {
    pub con_id: i32,
    pub ratio: i32,
    pub action: String,
    pub exchange: String,
    pub open_close: i32,
    pub short_sale_slot: i32,
    pub designated_location: String,
    pub exempt_code: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaNeutralContract {
    pub con_id: i32,
    pub delta: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagValue {
    pub tag: String,
    pub value: String,
}

/// Contract plus the static reference data returned by a details request.
/// Bond-specific fields are only filled for bond contract details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDetails {
    pub contract: Contract,
    pub market_name: String,
    pub min_tick: f64,
    pub md_size_multiplier: Option<i32>,
    pub order_types: String,
    pub valid_exchanges: String,
    pub price_magnifier: i32,
    pub under_con_id: i32,
    pub long_name: String,
    pub contract_month: String,
    pub industry: String,
    pub category: String,
    pub subcategory: String,
    pub time_zone_id: String,
    pub trading_hours: String,
    pub liquid_hours: String,
    pub ev_rule: String,
    pub ev_multiplier: f64,
    pub sec_id_list: Vec<TagValue>,
    pub agg_group: Option<i32>,
    pub under_symbol: String,
    pub under_sec_type: String,
    pub market_rule_ids: String,
    pub real_expiration_date: String,
    pub last_trade_time: String,
    pub cusip: String,
    pub coupon: f64,
    pub maturity: String,
    pub issue_date: String,
    pub ratings: String,
    pub bond_type: String,
    pub coupon_type: String,
    pub convertible: bool,
    pub callable: bool,
    pub putable: bool,
    pub desc_append: String,
    pub next_option_date: String,
    pub next_option_type: String,
    pub next_option_partial: bool,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDescription {
    pub contract: Contract,
    pub derivative_sec_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    /// Parse the wire form ("a"/"o", case-insensitive). Anything else is AND.
    pub fn from_wire(token: &str) -> Self {
        if token.eq_ignore_ascii_case("o") {
            Conjunction::Or
        } else {
            Conjunction::And
        }
    }
}

/// Wire discriminants of the order condition kinds.
pub mod condition_type {
    pub const PRICE: i32 = 1;
    pub const TIME: i32 = 3;
    pub const MARGIN: i32 = 4;
    pub const EXECUTION: i32 = 5;
    pub const VOLUME: i32 = 6;
    pub const PERCENT_CHANGE: i32 = 7;
}

/// Condition attached to a conditional order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderCondition {
    Execution {
        conjunction: Conjunction,
        sec_type: String,
        exchange: String,
        symbol: String,
    },
    Margin {
        conjunction: Conjunction,
        is_more: bool,
        percent: i32,
    },
    PercentChange {
        conjunction: Conjunction,
        is_more: bool,
        change_percent: f64,
        con_id: i32,
        exchange: String,
    },
    Price {
        conjunction: Conjunction,
        is_more: bool,
        price: f64,
        con_id: i32,
        exchange: String,
        trigger_method: i32,
    },
    Time {
        conjunction: Conjunction,
        is_more: bool,
        time: String,
    },
    Volume {
        conjunction: Conjunction,
        is_more: bool,
        volume: i32,
        con_id: i32,
        exchange: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderComboLeg {
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftDollarTier {
    pub name: String,
    pub value: String,
    pub display_name: String,
}

/// Order attributes as echoed back by open-order and completed-order messages.
/// `Option` fields carry the protocol's "unset" sentinels as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i32,
    pub client_id: i32,
    pub perm_id: i32,
    pub parent_id: i32,
    pub parent_perm_id: i64,
    pub action: String,
    pub total_quantity: Option<Decimal>,
    pub order_type: String,
    pub lmt_price: Option<f64>,
    pub aux_price: Option<f64>,
    pub tif: String,
    pub oca_group: String,
    pub oca_type: i32,
    pub account: String,
    pub open_close: String,
    pub origin: i32,
    pub order_ref: String,
    pub outside_rth: bool,
    pub hidden: bool,
    pub discretionary_amt: f64,
    pub good_after_time: String,
    pub good_till_date: String,
    pub fa_group: String,
    pub fa_method: String,
    pub fa_percentage: String,
    pub fa_profile: String,
    pub model_code: String,
    pub rule_80a: String,
    pub percent_offset: Option<f64>,
    pub settling_firm: String,
    pub short_sale_slot: i32,
    pub designated_location: String,
    pub exempt_code: i32,
    pub auction_strategy: i32,
    pub starting_price: Option<f64>,
    pub stock_ref_price: Option<f64>,
    pub delta: Option<f64>,
    pub stock_range_lower: Option<f64>,
    pub stock_range_upper: Option<f64>,
    pub display_size: Option<i32>,
    pub block_order: bool,
    pub sweep_to_fill: bool,
    pub all_or_none: bool,
    pub min_qty: Option<i32>,
    pub trigger_method: i32,
    pub volatility: Option<f64>,
    pub volatility_type: i32,
    pub delta_neutral_order_type: String,
    pub delta_neutral_aux_price: Option<f64>,
    pub delta_neutral_con_id: i32,
    pub delta_neutral_settling_firm: String,
    pub delta_neutral_clearing_account: String,
    pub delta_neutral_clearing_intent: String,
    pub delta_neutral_open_close: String,
    pub delta_neutral_short_sale: bool,
    pub delta_neutral_short_sale_slot: i32,
    pub delta_neutral_designated_location: String,
    pub continuous_update: i32,
    pub reference_price_type: i32,
    pub trail_stop_price: Option<f64>,
    pub trailing_percent: Option<f64>,
    pub basis_points: Option<f64>,
    pub basis_points_type: Option<i32>,
    pub order_combo_legs: Vec<OrderComboLeg>,
    pub smart_combo_routing_params: Vec<TagValue>,
    pub scale_init_level_size: Option<i32>,
    pub scale_subs_level_size: Option<i32>,
    pub scale_price_increment: Option<f64>,
    pub scale_price_adjust_value: Option<f64>,
    pub scale_price_adjust_interval: Option<i32>,
    pub scale_profit_offset: Option<f64>,
    pub scale_auto_reset: bool,
    pub scale_init_position: Option<i32>,
    pub scale_init_fill_qty: Option<i32>,
    pub scale_random_percent: bool,
    pub hedge_type: String,
    pub hedge_param: String,
    pub opt_out_smart_routing: bool,
    pub clearing_account: String,
    pub clearing_intent: String,
    pub not_held: bool,
    pub algo_strategy: String,
    pub algo_params: Vec<TagValue>,
    pub solicited: bool,
    pub what_if: bool,
    pub randomize_size: bool,
    pub randomize_price: bool,
    pub reference_contract_id: i32,
    pub is_pegged_change_amount_decrease: bool,
    pub pegged_change_amount: f64,
    pub reference_change_amount: f64,
    pub reference_exchange_id: String,
    pub conditions: Vec<OrderCondition>,
    pub conditions_ignore_rth: bool,
    pub conditions_cancel_order: bool,
    pub adjusted_order_type: String,
    pub trigger_price: Option<f64>,
    pub lmt_price_offset: Option<f64>,
    pub adjusted_stop_price: Option<f64>,
    pub adjusted_stop_limit_price: Option<f64>,
    pub adjusted_trailing_amount: Option<f64>,
    pub adjustable_trailing_unit: i32,
    pub soft_dollar_tier: Option<SoftDollarTier>,
    pub cash_qty: Option<f64>,
    pub dont_use_auto_price_for_hedge: bool,
    pub is_oms_container: bool,
    pub discretionary_up_to_limit_price: bool,
    pub use_price_mgmt_algo: bool,
    pub auto_cancel_date: String,
    pub filled_quantity: Option<Decimal>,
    pub ref_futures_con_id: i32,
    pub auto_cancel_parent: bool,
    pub shareholder: String,
    pub imbalance_only: bool,
    pub route_marketable_to_bbo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    pub status: String,
    pub init_margin_before: String,
    pub maint_margin_before: String,
    pub equity_with_loan_before: String,
    pub init_margin_change: String,
    pub maint_margin_change: String,
    pub equity_with_loan_change: String,
    pub init_margin_after: String,
    pub maint_margin_after: String,
    pub equity_with_loan_after: String,
    pub commission: Option<f64>,
    pub min_commission: Option<f64>,
    pub max_commission: Option<f64>,
    pub commission_currency: String,
    pub warning_text: String,
    pub completed_time: String,
    pub completed_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub order_id: i32,
    pub exec_id: String,
    pub time: String,
    pub acct_number: String,
    pub exchange: String,
    pub side: String,
    pub shares: Option<Decimal>,
    pub price: f64,
    pub perm_id: i32,
    pub client_id: i32,
    pub liquidation: i32,
    pub cum_qty: Option<Decimal>,
    pub avg_price: f64,
    pub order_ref: String,
    pub ev_rule: String,
    pub ev_multiplier: f64,
    pub model_code: String,
    pub last_liquidity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommissionReport {
    pub exec_id: String,
    pub commission: f64,
    pub currency: String,
    pub realized_pnl: f64,
    #[serde(rename = "yield")]
    pub yield_value: f64,
    pub yield_redemption_date: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<Decimal>,
    pub wap: f64,
    pub bar_count: i32,
    pub has_gaps: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickAttrib {
    pub can_auto_execute: bool,
    pub past_limit: bool,
    pub pre_open: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickAttribBidAsk {
    pub bid_past_low: bool,
    pub ask_past_high: bool,
}

impl TickAttribBidAsk {
    pub fn from_mask(mask: i32) -> Self {
        Self {
            bid_past_low: mask & 1 != 0,
            ask_past_high: mask & 2 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickAttribLast {
    pub past_limit: bool,
    pub unreported: bool,
}

impl TickAttribLast {
    pub fn from_mask(mask: i32) -> Self {
        Self {
            past_limit: mask & 1 != 0,
            unreported: mask & 2 != 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalTick {
    pub time: i64,
    pub price: f64,
    pub size: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalTickBidAsk {
    pub time: i64,
    pub attrib: TickAttribBidAsk,
    pub price_bid: f64,
    pub price_ask: f64,
    pub size_bid: Option<Decimal>,
    pub size_ask: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalTickLast {
    pub time: i64,
    pub attrib: TickAttribLast,
    pub price: f64,
    pub size: Option<Decimal>,
    pub exchange: String,
    pub special_conditions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramEntry {
    pub price: f64,
    pub size: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceIncrement {
    pub low_edge: f64,
    pub increment: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyCode {
    pub account_id: String,
    pub family_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsProvider {
    pub provider_code: String,
    pub provider_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthMktDataDescription {
    pub exchange: String,
    pub sec_type: String,
    pub listing_exch: String,
    pub service_data_type: String,
    pub agg_group: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartComponent {
    pub bit_number: i32,
    pub exchange: String,
    pub exchange_letter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannerRow {
    pub rank: i32,
    pub details: ContractDetails,
    pub distance: String,
    pub benchmark: String,
    pub projection: String,
    pub legs: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjunction_from_wire() {
        assert_eq!(Conjunction::from_wire("o"), Conjunction::Or);
        assert_eq!(Conjunction::from_wire("O"), Conjunction::Or);
        assert_eq!(Conjunction::from_wire("a"), Conjunction::And);
        assert_eq!(Conjunction::from_wire(""), Conjunction::And);
    }

    #[test]
    fn test_tick_attrib_masks() {
        let bid_ask = TickAttribBidAsk::from_mask(2);
        assert!(!bid_ask.bid_past_low);
        assert!(bid_ask.ask_past_high);

        let last = TickAttribLast::from_mask(3);
        assert!(last.past_limit);
        assert!(last.unreported);
    }

    #[test]
    fn test_condition_serializes_with_type_tag() {
        let cond = OrderCondition::Time {
            conjunction: Conjunction::Or,
            is_more: true,
            time: "20240102 10:00:00".into(),
        };
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], "time");
        assert_eq!(json["conjunction"], "or");
    }

    #[test]
    fn test_commission_report_yield_field_name() {
        let report = CommissionReport { yield_value: 1.5, ..Default::default() };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["yield"], 1.5);
    }
}
