use super::Decoder;
use super::order_builder::{OrderBuilder, OrderKind};
use crate::error::DecodeResult;
use crate::tws::events::Event;
use crate::tws::messages::min_server_ver;
use crate::tws::scalar::ScalarReader;

impl Decoder {
    pub(super) fn decode_order_status(&mut self) -> DecodeResult<()> {
        let version = if self.server_version >= min_server_ver::MARKET_CAP_PRICE {
            i32::MAX
        } else {
            self.read_int()?
        };

        let order_id = self.read_int()?;
        let status = self.read_string()?;
        let filled = self.read_decimal()?;
        let remaining = self.read_decimal()?;
        let avg_fill_price = self.read_double()?;
        let perm_id = if version >= 2 { self.read_int()? } else { 0 };
        let parent_id = if version >= 3 { self.read_int()? } else { 0 };
        let last_fill_price = if version >= 4 { self.read_double()? } else { 0.0 };
        let client_id = if version >= 5 { self.read_int()? } else { 0 };
        let why_held = if version >= 6 { self.read_string()? } else { String::new() };
        let mkt_cap_price = if self.server_version >= min_server_ver::MARKET_CAP_PRICE {
            Some(self.read_double()?)
        } else {
            None
        };

        self.emit(Event::OrderStatus {
            order_id,
            status,
            filled,
            remaining,
            avg_fill_price,
            perm_id,
            parent_id,
            last_fill_price,
            client_id,
            why_held,
            mkt_cap_price,
        });
        Ok(())
    }

    pub(super) fn decode_open_order(&mut self) -> DecodeResult<()> {
        let version = if self.server_version < min_server_ver::ORDER_CONTAINER {
            self.read_int()?
        } else {
            self.server_version
        };
        let (contract, order, order_state) =
            OrderBuilder::new(&mut self.queue, OrderKind::Open, version, self.server_version)
                .run()?;
        self.emit(Event::OpenOrder {
            order_id: order.order_id,
            contract,
            order,
            order_state,
        });
        Ok(())
    }

    pub(super) fn decode_open_order_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        self.emit(Event::OpenOrderEnd);
        Ok(())
    }

    pub(super) fn decode_completed_order(&mut self) -> DecodeResult<()> {
        let (contract, order, order_state) = OrderBuilder::new(
            &mut self.queue,
            OrderKind::Completed,
            i32::MAX,
            self.server_version,
        )
        .run()?;
        self.emit(Event::CompletedOrder { contract, order, order_state });
        Ok(())
    }

    pub(super) fn decode_completed_orders_end(&mut self) -> DecodeResult<()> {
        self.emit(Event::CompletedOrdersEnd);
        Ok(())
    }

    pub(super) fn decode_order_bound(&mut self) -> DecodeResult<()> {
        let order_id = self.read_long()?;
        let api_client_id = self.read_int()?;
        let api_order_id = self.read_int()?;
        self.emit(Event::OrderBound { order_id, api_client_id, api_order_id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::models::{Conjunction, OrderCondition};
    use rust_decimal_macros::dec;

    const CONTRACT: &[&str] = &[
        "265598", "AAPL", "STK", "", "0", "", "", "SMART", "USD", "AAPL", "NMS",
    ];

    fn open_order_tokens() -> Vec<&'static str> {
        let mut t = vec!["5", "42"];
        t.extend_from_slice(CONTRACT);
        t.extend_from_slice(&[
            // action, quantity, type, limit, aux
            "BUY", "100", "LMT", "185.5", "",
            // tif, oca group, account, open/close, origin, order ref
            "DAY", "", "DU123", "O", "0", "ref1",
            // client id, perm id
            "7", "123456",
            // outside rth, hidden, discretionary amount
            "1", "0", "0",
            // good after time, shares allocation
            "", "",
            // FA group, method, percentage, profile
            "", "", "", "",
            // model code, good till date
            "", "",
            // rule 80A, percent offset, settling firm
            "", "", "",
            // short sale slot, designated location, exempt code
            "0", "", "-1",
            // auction strategy
            "0",
            // starting price, stock ref price, delta
            "", "", "",
            // stock range lower/upper
            "", "",
            // display size
            "",
            // block order, sweep to fill, all or none
            "0", "0", "0",
            // min qty, oca type
            "", "3",
            // eTradeOnly, firmQuoteOnly, nbboPriceCap
            "0", "0", "",
            // parent id, trigger method
            "0", "0",
            // volatility, vol type, delta neutral type, dn aux, continuous update, ref price type
            "", "0", "", "", "0", "0",
            // trail stop price, trailing percent
            "", "",
            // basis points, basis points type
            "", "",
            // combo legs descrip, legs, order combo legs
            "", "0", "0",
            // smart combo routing params
            "0",
            // scale init, subs, increment
            "", "", "",
            // hedge type
            "",
            // opt out smart routing
            "0",
            // clearing account, intent
            "", "",
            // not held
            "0",
            // delta neutral contract
            "0",
            // algo strategy
            "",
            // solicited
            "0",
            // what-if, status, margins before/change/after, commissions, currency, warning
            "0", "Submitted", "", "", "", "", "", "", "", "", "", "", "", "", "", "",
            // randomize size, price
            "0", "0",
            // one price condition, then ignore rth, cancel order
            "1", "1", "a", "1", "190.5", "265598", "SMART", "0", "0", "0",
            // adjusted order params
            "", "", "", "", "", "", "", "0",
            // soft dollar tier
            "", "", "",
            // cash qty, auto price for hedge, oms container, discretionary up to, price mgmt algo
            "", "0", "0", "0", "0",
        ]);
        t
    }

    fn completed_order_tokens() -> Vec<&'static str> {
        let mut t = vec!["101"];
        t.extend_from_slice(CONTRACT);
        t.extend_from_slice(&[
            "SELL", "50", "LMT", "190", "",
            "GTC", "", "DU123", "C", "0", "",
            // perm id
            "654321",
            "0", "0", "0",
            // good after time
            "",
            "", "", "", "",
            "", "",
            "", "", "",
            "0", "", "-1",
            "", "", "",
            "", "",
            "",
            // sweep to fill, all or none
            "0", "0",
            "", "0",
            // trigger method
            "0",
            // volatility block without open-order attributes
            "", "0", "", "", "0", "0",
            "", "",
            "", "0", "0",
            "0",
            "", "", "",
            "",
            "", "",
            "0",
            "0",
            "",
            "0",
            // order status
            "Filled",
            "0", "0",
            // no conditions
            "0",
            // stop price, limit price offset
            "", "",
            // cash qty, auto price for hedge, oms container
            "", "0", "0",
            // auto cancel date, filled qty, ref futures con id, auto cancel parent,
            // shareholder, imbalance only, route marketable to bbo, parent perm id
            "", "50", "0", "0", "", "0", "0", "9007199254740993",
            // completed time, completed status
            "20240102 10:00:01", "Filled",
        ]);
        t
    }

    #[test]
    fn test_open_order_full_message() {
        let event = decode_one(176, &open_order_tokens());
        let Event::OpenOrder { order_id, contract, order, order_state } = event else { panic!() };

        assert_eq!(order_id, 42);
        assert_eq!(contract.con_id, 265598);
        assert_eq!(contract.trading_class, "NMS");
        assert_eq!(order.action, "BUY");
        assert_eq!(order.total_quantity, Some(dec!(100)));
        assert_eq!(order.lmt_price, Some(185.5));
        assert_eq!(order.aux_price, None);
        assert_eq!(order.client_id, 7);
        assert_eq!(order.perm_id, 123456);
        assert!(order.outside_rth);
        assert_eq!(order.exempt_code, -1);
        assert_eq!(order.oca_type, 3);
        assert_eq!(order.display_size, None);
        assert_eq!(order_state.status, "Submitted");
        assert_eq!(order_state.commission, None);
        assert_eq!(
            order.conditions,
            vec![OrderCondition::Price {
                conjunction: Conjunction::And,
                is_more: true,
                price: 190.5,
                con_id: 265598,
                exchange: "SMART".into(),
                trigger_method: 0,
            }]
        );
        assert_eq!(order.soft_dollar_tier.map(|t| t.name), Some(String::new()));
    }

    #[test]
    fn test_open_order_truncated_is_dropped() {
        let tokens = open_order_tokens();
        let events = decode(176, &tokens[..tokens.len() - 1]);
        assert_eq!(events.len(), 1);
        assert!(error_message(&events[0]).starts_with("Underrun error on OPEN_ORDER"));
    }

    #[test]
    fn test_completed_order_full_message() {
        let event = decode_one(176, &completed_order_tokens());
        let Event::CompletedOrder { contract, order, order_state } = event else { panic!() };

        assert_eq!(contract.symbol, "AAPL");
        assert_eq!(order.order_id, 0);
        assert_eq!(order.action, "SELL");
        assert_eq!(order.perm_id, 654321);
        assert_eq!(order.client_id, 0);
        assert_eq!(order.filled_quantity, Some(dec!(50)));
        assert_eq!(order.parent_perm_id, 9_007_199_254_740_993);
        assert!(order.conditions.is_empty());
        assert_eq!(order.soft_dollar_tier, None);
        assert_eq!(order_state.status, "Filled");
        assert_eq!(order_state.completed_time, "20240102 10:00:01");
        assert_eq!(order_state.completed_status, "Filled");
    }

    #[test]
    fn test_order_status_version_less() {
        let event = decode_one(
            176,
            &["3", "42", "Filled", "100", "0", "185.5", "123456", "0", "185.5", "7", "", "0"],
        );
        assert_eq!(
            event,
            Event::OrderStatus {
                order_id: 42,
                status: "Filled".into(),
                filled: Some(dec!(100)),
                remaining: Some(dec!(0)),
                avg_fill_price: 185.5,
                perm_id: 123456,
                parent_id: 0,
                last_fill_price: 185.5,
                client_id: 7,
                why_held: String::new(),
                mkt_cap_price: Some(0.0),
            }
        );
    }

    #[test]
    fn test_order_status_legacy_version() {
        let event = decode_one(100, &["3", "1", "42", "Submitted", "0", "100", "0"]);
        let Event::OrderStatus { perm_id, mkt_cap_price, remaining, .. } = event else { panic!() };
        assert_eq!(perm_id, 0);
        assert_eq!(mkt_cap_price, None);
        assert_eq!(remaining, Some(dec!(100)));
    }

    #[test]
    fn test_order_bound_and_ends() {
        assert_eq!(
            decode_one(176, &["100", "9007199254740993", "3", "17"]),
            Event::OrderBound { order_id: 9_007_199_254_740_993, api_client_id: 3, api_order_id: 17 }
        );
        assert_eq!(decode_one(176, &["53", "1"]), Event::OpenOrderEnd);
        assert_eq!(decode_one(176, &["102"]), Event::CompletedOrdersEnd);
    }
}
