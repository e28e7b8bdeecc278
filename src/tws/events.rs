use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::*;

/// Structured error delivered on the `error` channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub message: String,
    pub code: i32,
    pub req_id: i32,
    /// Extended rejection details attached by newer servers to order rejects.
    pub advanced_order_reject: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, code: i32, req_id: i32) -> Self {
        Self {
            message: message.into(),
            code,
            req_id,
            advanced_order_reject: None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (req {})", self.code, self.message, self.req_id)
    }
}

macro_rules! event_names {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Channel name of an event, as seen by facade subscribers.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum EventName {
            $($variant),+
        }

        impl EventName {
            pub const ALL: &'static [EventName] = &[$(EventName::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(EventName::$variant => $name),+
                }
            }
        }
    };
}

event_names! {
    Connected => "connected",
    Disconnected => "disconnected",
    Server => "server",
    Received => "received",
    Sent => "sent",
    Error => "error",
    Info => "info",
    TickPrice => "tickPrice",
    TickSize => "tickSize",
    OrderStatus => "orderStatus",
    OpenOrder => "openOrder",
    OpenOrderEnd => "openOrderEnd",
    UpdateAccountValue => "updateAccountValue",
    UpdatePortfolio => "updatePortfolio",
    UpdateAccountTime => "updateAccountTime",
    AccountDownloadEnd => "accountDownloadEnd",
    NextValidId => "nextValidId",
    ContractDetails => "contractDetails",
    BondContractDetails => "bondContractDetails",
    ContractDetailsEnd => "contractDetailsEnd",
    ExecDetails => "execDetails",
    ExecDetailsEnd => "execDetailsEnd",
    UpdateMktDepth => "updateMktDepth",
    UpdateMktDepthL2 => "updateMktDepthL2",
    UpdateNewsBulletin => "updateNewsBulletin",
    ManagedAccounts => "managedAccounts",
    ReceiveFa => "receiveFa",
    HistoricalData => "historicalData",
    HistoricalDataEnd => "historicalDataEnd",
    HistoricalDataUpdate => "historicalDataUpdate",
    ScannerParameters => "scannerParameters",
    ScannerData => "scannerData",
    ScannerDataEnd => "scannerDataEnd",
    TickOptionComputation => "tickOptionComputation",
    TickGeneric => "tickGeneric",
    TickString => "tickString",
    TickEfp => "tickEfp",
    CurrentTime => "currentTime",
    RealtimeBar => "realtimeBar",
    FundamentalData => "fundamentalData",
    DeltaNeutralValidation => "deltaNeutralValidation",
    TickSnapshotEnd => "tickSnapshotEnd",
    MarketDataType => "marketDataType",
    CommissionReport => "commissionReport",
    Position => "position",
    PositionEnd => "positionEnd",
    AccountSummary => "accountSummary",
    AccountSummaryEnd => "accountSummaryEnd",
    DisplayGroupList => "displayGroupList",
    DisplayGroupUpdated => "displayGroupUpdated",
    PositionMulti => "positionMulti",
    PositionMultiEnd => "positionMultiEnd",
    AccountUpdateMulti => "accountUpdateMulti",
    AccountUpdateMultiEnd => "accountUpdateMultiEnd",
    SecurityDefinitionOptionParameter => "securityDefinitionOptionParameter",
    SecurityDefinitionOptionParameterEnd => "securityDefinitionOptionParameterEnd",
    SoftDollarTiers => "softDollarTiers",
    FamilyCodes => "familyCodes",
    SymbolSamples => "symbolSamples",
    MktDepthExchanges => "mktDepthExchanges",
    TickReqParams => "tickReqParams",
    SmartComponents => "smartComponents",
    NewsArticle => "newsArticle",
    TickNews => "tickNews",
    NewsProviders => "newsProviders",
    HistoricalNews => "historicalNews",
    HistoricalNewsEnd => "historicalNewsEnd",
    HeadTimestamp => "headTimestamp",
    HistogramData => "histogramData",
    RerouteMktDataReq => "rerouteMktDataReq",
    RerouteMktDepthReq => "rerouteMktDepthReq",
    MarketRule => "marketRule",
    Pnl => "pnl",
    PnlSingle => "pnlSingle",
    HistoricalTicks => "historicalTicks",
    HistoricalTicksBidAsk => "historicalTicksBidAsk",
    HistoricalTicksLast => "historicalTicksLast",
    TickByTickAllLast => "tickByTickAllLast",
    TickByTickBidAsk => "tickByTickBidAsk",
    TickByTickMidPoint => "tickByTickMidPoint",
    OrderBound => "orderBound",
    CompletedOrder => "completedOrder",
    CompletedOrdersEnd => "completedOrdersEnd",
}

impl EventName {
    /// Connection lifecycle, error and raw I/O channels. These are not
    /// mirrored onto the `result` channel.
    pub fn is_lifecycle(self) -> bool {
        matches!(
            self,
            EventName::Connected
                | EventName::Disconnected
                | EventName::Error
                | EventName::Received
                | EventName::Sent
                | EventName::Server
        )
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the engine publishes: connection lifecycle, raw I/O, and one
/// variant per decoded message shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Event {
    Connected,
    Disconnected,
    Server {
        version: i32,
        time: String,
    },
    Received {
        tokens: Vec<String>,
    },
    Sent {
        tokens: Vec<String>,
    },
    Error(ApiError),
    Info {
        message: String,
        code: i32,
    },
    TickPrice {
        ticker_id: i32,
        field: i32,
        price: f64,
        attrib: TickAttrib,
    },
    TickSize {
        ticker_id: i32,
        field: i32,
        size: Option<Decimal>,
    },
    OrderStatus {
        order_id: i32,
        status: String,
        filled: Option<Decimal>,
        remaining: Option<Decimal>,
        avg_fill_price: f64,
        perm_id: i32,
        parent_id: i32,
        last_fill_price: f64,
        client_id: i32,
        why_held: String,
        mkt_cap_price: Option<f64>,
    },
    OpenOrder {
        order_id: i32,
        contract: Contract,
        order: Order,
        order_state: OrderState,
    },
    OpenOrderEnd,
    UpdateAccountValue {
        key: String,
        value: String,
        currency: String,
        account_name: String,
    },
    UpdatePortfolio {
        contract: Contract,
        position: Option<Decimal>,
        market_price: f64,
        market_value: f64,
        average_cost: Option<f64>,
        unrealized_pnl: Option<f64>,
        realized_pnl: Option<f64>,
        account_name: String,
    },
    UpdateAccountTime {
        time_stamp: String,
    },
    AccountDownloadEnd {
        account_name: String,
    },
    NextValidId {
        order_id: i32,
    },
    ContractDetails {
        req_id: i32,
        details: ContractDetails,
    },
    BondContractDetails {
        req_id: i32,
        details: ContractDetails,
    },
    ContractDetailsEnd {
        req_id: i32,
    },
    ExecDetails {
        req_id: i32,
        contract: Contract,
        execution: Execution,
    },
    ExecDetailsEnd {
        req_id: i32,
    },
    UpdateMktDepth {
        ticker_id: i32,
        position: i32,
        operation: i32,
        side: i32,
        price: f64,
        size: Option<Decimal>,
    },
    UpdateMktDepthL2 {
        ticker_id: i32,
        position: i32,
        market_maker: String,
        operation: i32,
        side: i32,
        price: f64,
        size: Option<Decimal>,
        is_smart_depth: bool,
    },
    UpdateNewsBulletin {
        msg_id: i32,
        msg_type: i32,
        message: String,
        origin_exchange: String,
    },
    ManagedAccounts {
        accounts: String,
    },
    ReceiveFa {
        fa_data_type: i32,
        xml: String,
    },
    HistoricalData {
        req_id: i32,
        bar: Bar,
    },
    HistoricalDataEnd {
        req_id: i32,
        start: String,
        end: String,
    },
    HistoricalDataUpdate {
        req_id: i32,
        bar: Bar,
    },
    ScannerParameters {
        xml: String,
    },
    ScannerData {
        req_id: i32,
        row: ScannerRow,
    },
    ScannerDataEnd {
        req_id: i32,
    },
    TickOptionComputation {
        ticker_id: i32,
        field: i32,
        implied_vol: Option<f64>,
        delta: Option<f64>,
        opt_price: Option<f64>,
        pv_dividend: Option<f64>,
        gamma: Option<f64>,
        vega: Option<f64>,
        theta: Option<f64>,
        und_price: Option<f64>,
    },
    TickGeneric {
        ticker_id: i32,
        field: i32,
        value: f64,
    },
    TickString {
        ticker_id: i32,
        field: i32,
        value: String,
    },
    TickEfp {
        ticker_id: i32,
        field: i32,
        basis_points: f64,
        formatted_basis_points: String,
        implied_futures_price: f64,
        hold_days: i32,
        future_last_trade_date: String,
        dividend_impact: f64,
        dividends_to_last_trade_date: f64,
    },
    CurrentTime {
        time: i64,
    },
    RealtimeBar {
        req_id: i32,
        time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<Decimal>,
        wap: f64,
        count: i32,
    },
    FundamentalData {
        req_id: i32,
        data: String,
    },
    DeltaNeutralValidation {
        req_id: i32,
        contract: DeltaNeutralContract,
    },
    TickSnapshotEnd {
        req_id: i32,
    },
    MarketDataType {
        req_id: i32,
        market_data_type: i32,
    },
    CommissionReport {
        report: CommissionReport,
    },
    Position {
        account: String,
        contract: Contract,
        position: Option<Decimal>,
        avg_cost: f64,
    },
    PositionEnd,
    AccountSummary {
        req_id: i32,
        account: String,
        tag: String,
        value: String,
        currency: String,
    },
    AccountSummaryEnd {
        req_id: i32,
    },
    DisplayGroupList {
        req_id: i32,
        groups: String,
    },
    DisplayGroupUpdated {
        req_id: i32,
        contract_info: String,
    },
    PositionMulti {
        req_id: i32,
        account: String,
        model_code: String,
        contract: Contract,
        position: Option<Decimal>,
        avg_cost: f64,
    },
    PositionMultiEnd {
        req_id: i32,
    },
    AccountUpdateMulti {
        req_id: i32,
        account: String,
        model_code: String,
        key: String,
        value: String,
        currency: String,
    },
    AccountUpdateMultiEnd {
        req_id: i32,
    },
    SecurityDefinitionOptionParameter {
        req_id: i32,
        exchange: String,
        underlying_con_id: i32,
        trading_class: String,
        multiplier: String,
        expirations: Vec<String>,
        strikes: Vec<f64>,
    },
    SecurityDefinitionOptionParameterEnd {
        req_id: i32,
    },
    SoftDollarTiers {
        req_id: i32,
        tiers: Vec<SoftDollarTier>,
    },
    FamilyCodes {
        codes: Vec<FamilyCode>,
    },
    SymbolSamples {
        req_id: i32,
        descriptions: Vec<ContractDescription>,
    },
    MktDepthExchanges {
        descriptions: Vec<DepthMktDataDescription>,
    },
    TickReqParams {
        ticker_id: i32,
        min_tick: f64,
        bbo_exchange: String,
        snapshot_permissions: i32,
    },
    SmartComponents {
        req_id: i32,
        components: Vec<SmartComponent>,
    },
    NewsArticle {
        req_id: i32,
        article_type: i32,
        article_text: String,
    },
    TickNews {
        ticker_id: i32,
        time_stamp: i64,
        provider_code: String,
        article_id: String,
        headline: String,
        extra_data: String,
    },
    NewsProviders {
        providers: Vec<NewsProvider>,
    },
    HistoricalNews {
        req_id: i32,
        time: String,
        provider_code: String,
        article_id: String,
        headline: String,
    },
    HistoricalNewsEnd {
        req_id: i32,
        has_more: bool,
    },
    HeadTimestamp {
        req_id: i32,
        head_timestamp: String,
    },
    HistogramData {
        req_id: i32,
        items: Vec<HistogramEntry>,
    },
    RerouteMktDataReq {
        req_id: i32,
        con_id: i32,
        exchange: String,
    },
    RerouteMktDepthReq {
        req_id: i32,
        con_id: i32,
        exchange: String,
    },
    MarketRule {
        market_rule_id: i32,
        increments: Vec<PriceIncrement>,
    },
    Pnl {
        req_id: i32,
        daily_pnl: f64,
        unrealized_pnl: Option<f64>,
        realized_pnl: Option<f64>,
    },
    PnlSingle {
        req_id: i32,
        position: Option<Decimal>,
        daily_pnl: f64,
        unrealized_pnl: Option<f64>,
        realized_pnl: Option<f64>,
        value: f64,
    },
    HistoricalTicks {
        req_id: i32,
        ticks: Vec<HistoricalTick>,
        done: bool,
    },
    HistoricalTicksBidAsk {
        req_id: i32,
        ticks: Vec<HistoricalTickBidAsk>,
        done: bool,
    },
    HistoricalTicksLast {
        req_id: i32,
        ticks: Vec<HistoricalTickLast>,
        done: bool,
    },
    TickByTickAllLast {
        req_id: i32,
        tick_type: i32,
        time: i64,
        price: f64,
        size: Option<Decimal>,
        attrib: TickAttribLast,
        exchange: String,
        special_conditions: String,
    },
    TickByTickBidAsk {
        req_id: i32,
        time: i64,
        bid_price: f64,
        ask_price: f64,
        bid_size: Option<Decimal>,
        ask_size: Option<Decimal>,
        attrib: TickAttribBidAsk,
    },
    TickByTickMidPoint {
        req_id: i32,
        time: i64,
        mid_point: f64,
    },
    OrderBound {
        order_id: i64,
        api_client_id: i32,
        api_order_id: i32,
    },
    CompletedOrder {
        contract: Contract,
        order: Order,
        order_state: OrderState,
    },
    CompletedOrdersEnd,
}

impl Event {
    pub fn name(&self) -> EventName {
        match self {
            Event::Connected => EventName::Connected,
            Event::Disconnected => EventName::Disconnected,
            Event::Server { .. } => EventName::Server,
            Event::Received { .. } => EventName::Received,
            Event::Sent { .. } => EventName::Sent,
            Event::Error(_) => EventName::Error,
            Event::Info { .. } => EventName::Info,
            Event::TickPrice { .. } => EventName::TickPrice,
            Event::TickSize { .. } => EventName::TickSize,
            Event::OrderStatus { .. } => EventName::OrderStatus,
            Event::OpenOrder { .. } => EventName::OpenOrder,
            Event::OpenOrderEnd => EventName::OpenOrderEnd,
            Event::UpdateAccountValue { .. } => EventName::UpdateAccountValue,
            Event::UpdatePortfolio { .. } => EventName::UpdatePortfolio,
            Event::UpdateAccountTime { .. } => EventName::UpdateAccountTime,
            Event::AccountDownloadEnd { .. } => EventName::AccountDownloadEnd,
            Event::NextValidId { .. } => EventName::NextValidId,
            Event::ContractDetails { .. } => EventName::ContractDetails,
            Event::BondContractDetails { .. } => EventName::BondContractDetails,
            Event::ContractDetailsEnd { .. } => EventName::ContractDetailsEnd,
            Event::ExecDetails { .. } => EventName::ExecDetails,
            Event::ExecDetailsEnd { .. } => EventName::ExecDetailsEnd,
            Event::UpdateMktDepth { .. } => EventName::UpdateMktDepth,
            Event::UpdateMktDepthL2 { .. } => EventName::UpdateMktDepthL2,
            Event::UpdateNewsBulletin { .. } => EventName::UpdateNewsBulletin,
            Event::ManagedAccounts { .. } => EventName::ManagedAccounts,
            Event::ReceiveFa { .. } => EventName::ReceiveFa,
            Event::HistoricalData { .. } => EventName::HistoricalData,
            Event::HistoricalDataEnd { .. } => EventName::HistoricalDataEnd,
            Event::HistoricalDataUpdate { .. } => EventName::HistoricalDataUpdate,
            Event::ScannerParameters { .. } => EventName::ScannerParameters,
            Event::ScannerData { .. } => EventName::ScannerData,
            Event::ScannerDataEnd { .. } => EventName::ScannerDataEnd,
            Event::TickOptionComputation { .. } => EventName::TickOptionComputation,
            Event::TickGeneric { .. } => EventName::TickGeneric,
            Event::TickString { .. } => EventName::TickString,
            Event::TickEfp { .. } => EventName::TickEfp,
            Event::CurrentTime { .. } => EventName::CurrentTime,
            Event::RealtimeBar { .. } => EventName::RealtimeBar,
            Event::FundamentalData { .. } => EventName::FundamentalData,
            Event::DeltaNeutralValidation { .. } => EventName::DeltaNeutralValidation,
            Event::TickSnapshotEnd { .. } => EventName::TickSnapshotEnd,
            Event::MarketDataType { .. } => EventName::MarketDataType,
            Event::CommissionReport { .. } => EventName::CommissionReport,
            Event::Position { .. } => EventName::Position,
            Event::PositionEnd => EventName::PositionEnd,
            Event::AccountSummary { .. } => EventName::AccountSummary,
            Event::AccountSummaryEnd { .. } => EventName::AccountSummaryEnd,
            Event::DisplayGroupList { .. } => EventName::DisplayGroupList,
            Event::DisplayGroupUpdated { .. } => EventName::DisplayGroupUpdated,
            Event::PositionMulti { .. } => EventName::PositionMulti,
            Event::PositionMultiEnd { .. } => EventName::PositionMultiEnd,
            Event::AccountUpdateMulti { .. } => EventName::AccountUpdateMulti,
            Event::AccountUpdateMultiEnd { .. } => EventName::AccountUpdateMultiEnd,
            Event::SecurityDefinitionOptionParameter { .. } => {
                EventName::SecurityDefinitionOptionParameter
            }
            Event::SecurityDefinitionOptionParameterEnd { .. } => {
                EventName::SecurityDefinitionOptionParameterEnd
            }
            Event::SoftDollarTiers { .. } => EventName::SoftDollarTiers,
            Event::FamilyCodes { .. } => EventName::FamilyCodes,
            Event::SymbolSamples { .. } => EventName::SymbolSamples,
            Event::MktDepthExchanges { .. } => EventName::MktDepthExchanges,
            Event::TickReqParams { .. } => EventName::TickReqParams,
            Event::SmartComponents { .. } => EventName::SmartComponents,
            Event::NewsArticle { .. } => EventName::NewsArticle,
            Event::TickNews { .. } => EventName::TickNews,
            Event::NewsProviders { .. } => EventName::NewsProviders,
            Event::HistoricalNews { .. } => EventName::HistoricalNews,
            Event::HistoricalNewsEnd { .. } => EventName::HistoricalNewsEnd,
            Event::HeadTimestamp { .. } => EventName::HeadTimestamp,
            Event::HistogramData { .. } => EventName::HistogramData,
            Event::RerouteMktDataReq { .. } => EventName::RerouteMktDataReq,
            Event::RerouteMktDepthReq { .. } => EventName::RerouteMktDepthReq,
            Event::MarketRule { .. } => EventName::MarketRule,
            Event::Pnl { .. } => EventName::Pnl,
            Event::PnlSingle { .. } => EventName::PnlSingle,
            Event::HistoricalTicks { .. } => EventName::HistoricalTicks,
            Event::HistoricalTicksBidAsk { .. } => EventName::HistoricalTicksBidAsk,
            Event::HistoricalTicksLast { .. } => EventName::HistoricalTicksLast,
            Event::TickByTickAllLast { .. } => EventName::TickByTickAllLast,
            Event::TickByTickBidAsk { .. } => EventName::TickByTickBidAsk,
            Event::TickByTickMidPoint { .. } => EventName::TickByTickMidPoint,
            Event::OrderBound { .. } => EventName::OrderBound,
            Event::CompletedOrder { .. } => EventName::CompletedOrder,
            Event::CompletedOrdersEnd => EventName::CompletedOrdersEnd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_channels() {
        let lifecycle: Vec<_> = EventName::ALL
            .iter()
            .filter(|name| name.is_lifecycle())
            .map(|name| name.as_str())
            .collect();
        assert_eq!(
            lifecycle,
            vec!["connected", "disconnected", "server", "received", "sent", "error"]
        );
        assert!(!EventName::Info.is_lifecycle());
        assert!(!EventName::TickPrice.is_lifecycle());
    }

    #[test]
    fn test_serde_tag_matches_channel_name() {
        let events = [
            Event::Connected,
            Event::TickSize { ticker_id: 1, field: 0, size: None },
            Event::Error(ApiError::new("boom", 505, -1)),
            Event::UpdateMktDepthL2 {
                ticker_id: 1,
                position: 0,
                market_maker: "MM".into(),
                operation: 0,
                side: 1,
                price: 1.0,
                size: None,
                is_smart_depth: false,
            },
            Event::PnlSingle {
                req_id: 3,
                position: None,
                daily_pnl: 0.0,
                unrealized_pnl: None,
                realized_pnl: None,
                value: 0.0,
            },
            Event::CompletedOrdersEnd,
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.name().as_str());
        }
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::new("Order rejected", 201, 7);
        assert_eq!(err.to_string(), "[201] Order rejected (req 7)");
    }
}
