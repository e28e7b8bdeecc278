use super::Decoder;
use crate::error::DecodeResult;
use crate::models::*;
use crate::tws::events::Event;
use crate::tws::messages::{min_server_ver, tick_type};
use crate::tws::scalar::ScalarReader;

/// Option greeks use -1 (prices, vols) and -2 (greeks) for "not computed".
fn not_computed(value: f64, sentinel: f64) -> Option<f64> {
    (value != sentinel).then_some(value)
}

impl Decoder {
    pub(super) fn decode_tick_price(&mut self) -> DecodeResult<()> {
        let version = self.read_int()?;
        let ticker_id = self.read_int()?;
        let field = self.read_int()?;
        let price = self.read_double()?;
        let size = if version >= 2 { self.read_decimal()? } else { None };

        let mut attrib = TickAttrib::default();
        if version >= 3 {
            let mask = self.read_int()?;
            attrib.can_auto_execute = mask & 1 != 0;
            if self.server_version >= min_server_ver::PAST_LIMIT {
                attrib.past_limit = mask & 2 != 0;
                if self.server_version >= min_server_ver::PRE_OPEN_BID_ASK {
                    attrib.pre_open = mask & 4 != 0;
                }
            }
        }

        self.emit(Event::TickPrice { ticker_id, field, price, attrib });

        if version >= 2 {
            if let Some(size_field) = tick_type::size_companion(field) {
                self.emit(Event::TickSize { ticker_id, field: size_field, size });
            }
        }
        Ok(())
    }

    pub(super) fn decode_tick_size(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let ticker_id = self.read_int()?;
        let field = self.read_int()?;
        let size = self.read_decimal()?;
        self.emit(Event::TickSize { ticker_id, field, size });
        Ok(())
    }

    pub(super) fn decode_tick_option_computation(&mut self) -> DecodeResult<()> {
        let version = self.read_int()?;
        let ticker_id = self.read_int()?;
        let field = self.read_int()?;
        let implied_vol = not_computed(self.read_double()?, -1.0);
        let delta = not_computed(self.read_double()?, -2.0);

        let mut opt_price = None;
        let mut pv_dividend = None;
        if version >= 6
            || field == tick_type::MODEL_OPTION
            || field == tick_type::DELAYED_MODEL_OPTION
        {
            opt_price = not_computed(self.read_double()?, -1.0);
            pv_dividend = not_computed(self.read_double()?, -1.0);
        }

        let (mut gamma, mut vega, mut theta, mut und_price) = (None, None, None, None);
        if version >= 6 {
            gamma = not_computed(self.read_double()?, -2.0);
            vega = not_computed(self.read_double()?, -2.0);
            theta = not_computed(self.read_double()?, -2.0);
            und_price = not_computed(self.read_double()?, -1.0);
        }

        self.emit(Event::TickOptionComputation {
            ticker_id,
            field,
            implied_vol,
            delta,
            opt_price,
            pv_dividend,
            gamma,
            vega,
            theta,
            und_price,
        });
        Ok(())
    }

    pub(super) fn decode_tick_generic(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let ticker_id = self.read_int()?;
        let field = self.read_int()?;
        let value = self.read_double()?;
        self.emit(Event::TickGeneric { ticker_id, field, value });
        Ok(())
    }

    pub(super) fn decode_tick_string(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let ticker_id = self.read_int()?;
        let field = self.read_int()?;
        let value = self.read_string()?;
        self.emit(Event::TickString { ticker_id, field, value });
        Ok(())
    }

    pub(super) fn decode_tick_efp(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let ticker_id = self.read_int()?;
        let field = self.read_int()?;
        let basis_points = self.read_double()?;
        let formatted_basis_points = self.read_string()?;
        let implied_futures_price = self.read_double()?;
        let hold_days = self.read_int()?;
        let future_last_trade_date = self.read_string()?;
        let dividend_impact = self.read_double()?;
        let dividends_to_last_trade_date = self.read_double()?;
        self.emit(Event::TickEfp {
            ticker_id,
            field,
            basis_points,
            formatted_basis_points,
            implied_futures_price,
            hold_days,
            future_last_trade_date,
            dividend_impact,
            dividends_to_last_trade_date,
        });
        Ok(())
    }

    pub(super) fn decode_tick_snapshot_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        self.emit(Event::TickSnapshotEnd { req_id });
        Ok(())
    }

    pub(super) fn decode_market_data_type(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let market_data_type = self.read_int()?;
        self.emit(Event::MarketDataType { req_id, market_data_type });
        Ok(())
    }

    pub(super) fn decode_tick_req_params(&mut self) -> DecodeResult<()> {
        let ticker_id = self.read_int()?;
        let min_tick = self.read_double()?;
        let bbo_exchange = self.read_string()?;
        let snapshot_permissions = self.read_int()?;
        self.emit(Event::TickReqParams {
            ticker_id,
            min_tick,
            bbo_exchange,
            snapshot_permissions,
        });
        Ok(())
    }

    pub(super) fn decode_market_depth(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let ticker_id = self.read_int()?;
        let position = self.read_int()?;
        let operation = self.read_int()?;
        let side = self.read_int()?;
        let price = self.read_double()?;
        let size = self.read_decimal()?;
        self.emit(Event::UpdateMktDepth {
            ticker_id,
            position,
            operation,
            side,
            price,
            size,
        });
        Ok(())
    }

    pub(super) fn decode_market_depth_l2(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let ticker_id = self.read_int()?;
        let position = self.read_int()?;
        let market_maker = self.read_string()?;
        let operation = self.read_int()?;
        let side = self.read_int()?;
        let price = self.read_double()?;
        let size = self.read_decimal()?;
        let is_smart_depth = if self.server_version >= min_server_ver::SMART_DEPTH {
            self.read_bool()?
        } else {
            false
        };
        self.emit(Event::UpdateMktDepthL2 {
            ticker_id,
            position,
            market_maker,
            operation,
            side,
            price,
            size,
            is_smart_depth,
        });
        Ok(())
    }

    pub(super) fn decode_mkt_depth_exchanges(&mut self) -> DecodeResult<()> {
        let descriptions = self.read_list(|d| {
            if d.server_version >= min_server_ver::SERVICE_DATA_TYPE {
                Ok(DepthMktDataDescription {
                    exchange: d.read_string()?,
                    sec_type: d.read_string()?,
                    listing_exch: d.read_string()?,
                    service_data_type: d.read_string()?,
                    agg_group: d.read_int_or_absent()?,
                })
            } else {
                let exchange = d.read_string()?;
                let sec_type = d.read_string()?;
                let is_l2 = d.read_bool()?;
                Ok(DepthMktDataDescription {
                    exchange,
                    sec_type,
                    service_data_type: if is_l2 { "Deep2" } else { "Deep" }.to_string(),
                    ..Default::default()
                })
            }
        })?;
        self.emit(Event::MktDepthExchanges { descriptions });
        Ok(())
    }

    pub(super) fn decode_smart_components(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let components = self.read_list(|d| {
            Ok(SmartComponent {
                bit_number: d.read_int()?,
                exchange: d.read_string()?,
                exchange_letter: d.read_string()?,
            })
        })?;
        self.emit(Event::SmartComponents { req_id, components });
        Ok(())
    }

    pub(super) fn decode_reroute_mkt_data(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let con_id = self.read_int()?;
        let exchange = self.read_string()?;
        self.emit(Event::RerouteMktDataReq { req_id, con_id, exchange });
        Ok(())
    }

    pub(super) fn decode_reroute_mkt_depth(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let con_id = self.read_int()?;
        let exchange = self.read_string()?;
        self.emit(Event::RerouteMktDepthReq { req_id, con_id, exchange });
        Ok(())
    }

    pub(super) fn decode_historical_data(&mut self) -> DecodeResult<()> {
        let version = if self.server_version >= min_server_ver::SYNT_REALTIME_BARS {
            i32::MAX
        } else {
            self.read_int()?
        };
        let req_id = self.read_int()?;

        let (mut start, mut end) = (String::new(), String::new());
        if version >= 2 {
            start = self.read_string()?;
            end = self.read_string()?;
        }

        let count = self.read_int()?;
        for _ in 0..count {
            let mut bar = Bar {
                time: self.read_string()?,
                open: self.read_double()?,
                high: self.read_double()?,
                low: self.read_double()?,
                close: self.read_double()?,
                volume: self.read_decimal()?,
                wap: self.read_double()?,
                bar_count: -1,
                has_gaps: None,
            };
            if self.server_version < min_server_ver::SYNT_REALTIME_BARS {
                bar.has_gaps = Some(self.read_bool()?);
            }
            if version >= 3 {
                bar.bar_count = self.read_int()?;
            }
            self.emit(Event::HistoricalData { req_id, bar });
        }

        self.emit(Event::HistoricalDataEnd { req_id, start, end });
        Ok(())
    }

    pub(super) fn decode_historical_data_update(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let bar_count = self.read_int()?;
        let time = self.read_string()?;
        let open = self.read_double()?;
        let close = self.read_double()?;
        let high = self.read_double()?;
        let low = self.read_double()?;
        let wap = self.read_double()?;
        let volume = self.read_decimal()?;
        let bar = Bar {
            time,
            open,
            high,
            low,
            close,
            volume,
            wap,
            bar_count,
            has_gaps: None,
        };
        self.emit(Event::HistoricalDataUpdate { req_id, bar });
        Ok(())
    }

    pub(super) fn decode_real_time_bars(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let time = self.read_long()?;
        let open = self.read_double()?;
        let high = self.read_double()?;
        let low = self.read_double()?;
        let close = self.read_double()?;
        let volume = self.read_decimal()?;
        let wap = self.read_double()?;
        let count = self.read_int()?;
        self.emit(Event::RealtimeBar {
            req_id,
            time,
            open,
            high,
            low,
            close,
            volume,
            wap,
            count,
        });
        Ok(())
    }

    pub(super) fn decode_historical_ticks(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let ticks = self.read_list(|d| {
            let time = d.read_long()?;
            d.read_int()?;
            Ok(HistoricalTick {
                time,
                price: d.read_double()?,
                size: d.read_decimal()?,
            })
        })?;
        let done = self.read_bool()?;
        self.emit(Event::HistoricalTicks { req_id, ticks, done });
        Ok(())
    }

    pub(super) fn decode_historical_ticks_bid_ask(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let ticks = self.read_list(|d| {
            Ok(HistoricalTickBidAsk {
                time: d.read_long()?,
                attrib: TickAttribBidAsk::from_mask(d.read_int()?),
                price_bid: d.read_double()?,
                price_ask: d.read_double()?,
                size_bid: d.read_decimal()?,
                size_ask: d.read_decimal()?,
            })
        })?;
        let done = self.read_bool()?;
        self.emit(Event::HistoricalTicksBidAsk { req_id, ticks, done });
        Ok(())
    }

    pub(super) fn decode_historical_ticks_last(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let ticks = self.read_list(|d| {
            Ok(HistoricalTickLast {
                time: d.read_long()?,
                attrib: TickAttribLast::from_mask(d.read_int()?),
                price: d.read_double()?,
                size: d.read_decimal()?,
                exchange: d.read_string()?,
                special_conditions: d.read_string()?,
            })
        })?;
        let done = self.read_bool()?;
        self.emit(Event::HistoricalTicksLast { req_id, ticks, done });
        Ok(())
    }

    pub(super) fn decode_tick_by_tick(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let tick_type = self.read_int()?;
        let time = self.read_long()?;

        match tick_type {
            1 | 2 => {
                let price = self.read_double()?;
                let size = self.read_decimal()?;
                let attrib = TickAttribLast::from_mask(self.read_int()?);
                let exchange = self.read_string()?;
                let special_conditions = self.read_string()?;
                self.emit(Event::TickByTickAllLast {
                    req_id,
                    tick_type,
                    time,
                    price,
                    size,
                    attrib,
                    exchange,
                    special_conditions,
                });
            }
            3 => {
                let bid_price = self.read_double()?;
                let ask_price = self.read_double()?;
                let bid_size = self.read_decimal()?;
                let ask_size = self.read_decimal()?;
                let attrib = TickAttribBidAsk::from_mask(self.read_int()?);
                self.emit(Event::TickByTickBidAsk {
                    req_id,
                    time,
                    bid_price,
                    ask_price,
                    bid_size,
                    ask_size,
                    attrib,
                });
            }
            4 => {
                let mid_point = self.read_double()?;
                self.emit(Event::TickByTickMidPoint { req_id, time, mid_point });
            }
            // 0 is "none"; anything else carries no payload we understand.
            _ => {}
        }
        Ok(())
    }

    pub(super) fn decode_histogram_data(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let items = self.read_list(|d| {
            Ok(HistogramEntry {
                price: d.read_double()?,
                size: d.read_decimal()?,
            })
        })?;
        self.emit(Event::HistogramData { req_id, items });
        Ok(())
    }

    pub(super) fn decode_head_timestamp(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let head_timestamp = self.read_string()?;
        self.emit(Event::HeadTimestamp { req_id, head_timestamp });
        Ok(())
    }

    pub(super) fn decode_market_rule(&mut self) -> DecodeResult<()> {
        let market_rule_id = self.read_int()?;
        let increments = self.read_list(|d| {
            Ok(PriceIncrement {
                low_edge: d.read_double()?,
                increment: d.read_double()?,
            })
        })?;
        self.emit(Event::MarketRule { market_rule_id, increments });
        Ok(())
    }

    pub(super) fn decode_scanner_parameters(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let xml = self.read_string()?;
        self.emit(Event::ScannerParameters { xml });
        Ok(())
    }

    pub(super) fn decode_scanner_data(&mut self) -> DecodeResult<()> {
        let version = self.read_int()?;
        let req_id = self.read_int()?;
        let count = self.read_int()?;

        for _ in 0..count {
            let mut row = ScannerRow { rank: self.read_int()?, ..Default::default() };
            let details = &mut row.details;
            if version >= 3 {
                details.contract.con_id = self.read_int()?;
            }
            details.contract.symbol = self.read_string()?;
            details.contract.sec_type = self.read_string()?;
            self.read_last_trade_date(details, false)?;
            details.contract.strike = self.read_double()?;
            details.contract.right = self.read_string()?;
            details.contract.exchange = self.read_string()?;
            details.contract.currency = self.read_string()?;
            details.contract.local_symbol = self.read_string()?;
            details.market_name = self.read_string()?;
            details.contract.trading_class = self.read_string()?;
            row.distance = self.read_string()?;
            row.benchmark = self.read_string()?;
            row.projection = self.read_string()?;
            if version >= 2 {
                row.legs = Some(self.read_string()?);
            }
            self.emit(Event::ScannerData { req_id, row });
        }

        self.emit(Event::ScannerDataEnd { req_id });
        Ok(())
    }

    pub(super) fn decode_current_time(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let time = self.read_long()?;
        self.emit(Event::CurrentTime { time });
        Ok(())
    }

    pub(super) fn decode_fundamental_data(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let data = self.read_string()?;
        self.emit(Event::FundamentalData { req_id, data });
        Ok(())
    }
}
