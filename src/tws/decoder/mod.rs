//! Incoming message decoder.
//!
//! Tokens are queued as they arrive, then [`Decoder::process`] turns each whole
//! message into zero or more [`Event`]s. Messages pushed with
//! [`Decoder::enqueue_message`] are wrapped in boundary markers, which lets a
//! broken message be skipped without losing the ones behind it. Tokens pushed
//! with [`Decoder::enqueue_tokens`] carry no boundaries, so an incomplete
//! message is rolled back and retried once more tokens arrive.

mod account;
mod contract;
mod market;
mod news;
mod order_builder;
mod orders;

use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::tws::events::{ApiError, Event};
use crate::tws::messages::{error_code, in_msg, min_server_ver};
use crate::tws::queue::TokenQueue;
use crate::tws::scalar::{ScalarReader, decode_unicode_escaped_string};

pub use order_builder::OrderKind;

#[derive(Debug, Default)]
pub struct Decoder {
    queue: TokenQueue,
    emit_queue: Vec<Event>,
    server_version: i32,
}

impl ScalarReader for Decoder {
    fn next_token(&mut self) -> DecodeResult<&str> {
        self.queue.next_token()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one complete message received under length-prefixed framing.
    pub fn enqueue_message<I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.queue.push_message(tokens);
    }

    /// Queue raw tokens received under legacy framing.
    pub fn enqueue_tokens<I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.queue.push_tokens(tokens);
    }

    /// Number of queued slots not yet decoded.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.emit_queue.clear();
    }

    /// Decode every complete message in the queue, appending events to `out`.
    ///
    /// Protocol problems (trailing data, unknown message types, truncated
    /// framed messages) become error events and never stop the loop. A
    /// malformed number is returned as `Err` after its message has been
    /// discarded; calling `process` again resumes with the next message.
    pub fn process(&mut self, server_version: i32, out: &mut Vec<Event>) -> DecodeResult<()> {
        self.server_version = server_version;

        while !self.queue.is_empty() {
            self.emit_queue.clear();

            let framed = self.queue.at_boundary();
            if framed {
                self.queue.shift();
            }

            let mut msg_id = -1;
            let outcome = match self.read_int() {
                Ok(id) => {
                    msg_id = id;
                    self.dispatch(id)
                }
                Err(e) => Err(e),
            };
            let name = in_msg::name(msg_id);

            match outcome {
                Ok(true) => {
                    if framed {
                        if !self.queue.at_boundary() {
                            let left = self.queue.peek_until_boundary();
                            warn!(message = name, ?left, "unprocessed tokens after decode");
                            out.push(diagnostic(format!(
                                "Decoding error on {name}: unprocessed data left on queue ({left:?})"
                            )));
                        }
                        self.queue.skip_past_boundary();
                    }
                    self.queue.commit();
                    debug!(message = name, events = self.emit_queue.len(), "decoded");
                    out.append(&mut self.emit_queue);
                }
                Ok(false) => {
                    let mut message =
                        format!("No parser implementation found for token: {name} ({msg_id}).");
                    if framed {
                        self.queue.skip_past_boundary();
                    } else {
                        // Without boundaries there is no way to find the next message.
                        let discarded = self.queue.len();
                        self.queue.clear();
                        message.push_str(&format!(" Discarded {discarded} queued tokens."));
                    }
                    warn!(msg_id, framed, "no decoder for message type");
                    self.queue.commit();
                    out.push(diagnostic(message));
                }
                Err(DecodeError::Underrun(reason)) if framed => {
                    warn!(message = name, %reason, "truncated message dropped");
                    self.emit_queue.clear();
                    self.queue.skip_past_boundary();
                    self.queue.commit();
                    out.push(diagnostic(format!("Underrun error on {name}: {reason}")));
                }
                Err(DecodeError::Underrun(_)) => {
                    debug!(message = name, "waiting for more tokens");
                    self.emit_queue.clear();
                    self.queue.rollback();
                    return Ok(());
                }
                Err(e) => {
                    self.emit_queue.clear();
                    if framed {
                        self.queue.skip_past_boundary();
                    } else {
                        self.queue.clear();
                    }
                    self.queue.commit();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    fn emit(&mut self, event: Event) {
        self.emit_queue.push(event);
    }

    /// Route a message id to its decode routine. `Ok(false)` means no routine
    /// exists for the id.
    fn dispatch(&mut self, msg_id: i32) -> DecodeResult<bool> {
        match msg_id {
            in_msg::TICK_PRICE => self.decode_tick_price()?,
            in_msg::TICK_SIZE => self.decode_tick_size()?,
            in_msg::ORDER_STATUS => self.decode_order_status()?,
            in_msg::ERR_MSG => self.decode_err_msg()?,
            in_msg::OPEN_ORDER => self.decode_open_order()?,
            in_msg::ACCT_VALUE => self.decode_acct_value()?,
            in_msg::PORTFOLIO_VALUE => self.decode_portfolio_value()?,
            in_msg::ACCT_UPDATE_TIME => self.decode_acct_update_time()?,
            in_msg::NEXT_VALID_ID => self.decode_next_valid_id()?,
            in_msg::CONTRACT_DATA => self.decode_contract_data()?,
            in_msg::EXECUTION_DATA => self.decode_execution_data()?,
            in_msg::MARKET_DEPTH => self.decode_market_depth()?,
            in_msg::MARKET_DEPTH_L2 => self.decode_market_depth_l2()?,
            in_msg::NEWS_BULLETINS => self.decode_news_bulletins()?,
            in_msg::MANAGED_ACCTS => self.decode_managed_accts()?,
            in_msg::RECEIVE_FA => self.decode_receive_fa()?,
            in_msg::HISTORICAL_DATA => self.decode_historical_data()?,
            in_msg::BOND_CONTRACT_DATA => self.decode_bond_contract_data()?,
            in_msg::SCANNER_PARAMETERS => self.decode_scanner_parameters()?,
            in_msg::SCANNER_DATA => self.decode_scanner_data()?,
            in_msg::TICK_OPTION_COMPUTATION => self.decode_tick_option_computation()?,
            in_msg::TICK_GENERIC => self.decode_tick_generic()?,
            in_msg::TICK_STRING => self.decode_tick_string()?,
            in_msg::TICK_EFP => self.decode_tick_efp()?,
            in_msg::CURRENT_TIME => self.decode_current_time()?,
            in_msg::REAL_TIME_BARS => self.decode_real_time_bars()?,
            in_msg::FUNDAMENTAL_DATA => self.decode_fundamental_data()?,
            in_msg::CONTRACT_DATA_END => self.decode_contract_data_end()?,
            in_msg::OPEN_ORDER_END => self.decode_open_order_end()?,
            in_msg::ACCT_DOWNLOAD_END => self.decode_acct_download_end()?,
            in_msg::EXECUTION_DATA_END => self.decode_execution_data_end()?,
            in_msg::DELTA_NEUTRAL_VALIDATION => self.decode_delta_neutral_validation()?,
            in_msg::TICK_SNAPSHOT_END => self.decode_tick_snapshot_end()?,
            in_msg::MARKET_DATA_TYPE => self.decode_market_data_type()?,
            in_msg::COMMISSION_REPORT => self.decode_commission_report()?,
            in_msg::POSITION => self.decode_position()?,
            in_msg::POSITION_END => self.decode_position_end()?,
            in_msg::ACCOUNT_SUMMARY => self.decode_account_summary()?,
            in_msg::ACCOUNT_SUMMARY_END => self.decode_account_summary_end()?,
            in_msg::DISPLAY_GROUP_LIST => self.decode_display_group_list()?,
            in_msg::DISPLAY_GROUP_UPDATED => self.decode_display_group_updated()?,
            in_msg::POSITION_MULTI => self.decode_position_multi()?,
            in_msg::POSITION_MULTI_END => self.decode_position_multi_end()?,
            in_msg::ACCOUNT_UPDATE_MULTI => self.decode_account_update_multi()?,
            in_msg::ACCOUNT_UPDATE_MULTI_END => self.decode_account_update_multi_end()?,
            in_msg::SECURITY_DEFINITION_OPTION_PARAMETER => {
                self.decode_security_definition_option_parameter()?
            }
            in_msg::SECURITY_DEFINITION_OPTION_PARAMETER_END => {
                self.decode_security_definition_option_parameter_end()?
            }
            in_msg::SOFT_DOLLAR_TIERS => self.decode_soft_dollar_tiers()?,
            in_msg::FAMILY_CODES => self.decode_family_codes()?,
            in_msg::SYMBOL_SAMPLES => self.decode_symbol_samples()?,
            in_msg::MKT_DEPTH_EXCHANGES => self.decode_mkt_depth_exchanges()?,
            in_msg::TICK_REQ_PARAMS => self.decode_tick_req_params()?,
            in_msg::SMART_COMPONENTS => self.decode_smart_components()?,
            in_msg::NEWS_ARTICLE => self.decode_news_article()?,
            in_msg::TICK_NEWS => self.decode_tick_news()?,
            in_msg::NEWS_PROVIDERS => self.decode_news_providers()?,
            in_msg::HISTORICAL_NEWS => self.decode_historical_news()?,
            in_msg::HISTORICAL_NEWS_END => self.decode_historical_news_end()?,
            in_msg::HEAD_TIMESTAMP => self.decode_head_timestamp()?,
            in_msg::HISTOGRAM_DATA => self.decode_histogram_data()?,
            in_msg::HISTORICAL_DATA_UPDATE => self.decode_historical_data_update()?,
            in_msg::REROUTE_MKT_DATA => self.decode_reroute_mkt_data()?,
            in_msg::REROUTE_MKT_DEPTH => self.decode_reroute_mkt_depth()?,
            in_msg::MARKET_RULE => self.decode_market_rule()?,
            in_msg::PNL => self.decode_pnl()?,
            in_msg::PNL_SINGLE => self.decode_pnl_single()?,
            in_msg::HISTORICAL_TICKS => self.decode_historical_ticks()?,
            in_msg::HISTORICAL_TICKS_BID_ASK => self.decode_historical_ticks_bid_ask()?,
            in_msg::HISTORICAL_TICKS_LAST => self.decode_historical_ticks_last()?,
            in_msg::TICK_BY_TICK => self.decode_tick_by_tick()?,
            in_msg::ORDER_BOUND => self.decode_order_bound()?,
            in_msg::COMPLETED_ORDER => self.decode_completed_order()?,
            in_msg::COMPLETED_ORDERS_END => self.decode_completed_orders_end()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Read a `count` prefix followed by that many items.
    fn read_list<T>(
        &mut self,
        mut read_item: impl FnMut(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        let count = self.read_int()?;
        let mut items = Vec::with_capacity(count.clamp(0, 1024) as usize);
        for _ in 0..count {
            items.push(read_item(self)?);
        }
        Ok(items)
    }

    /// Read a free-text field. Newer servers send non-ASCII text as `\uXXXX` escapes.
    fn read_long_text(&mut self) -> DecodeResult<String> {
        let raw = self.read_string()?;
        if self.server_version >= min_server_ver::ENCODE_MSG_ASCII7 {
            Ok(decode_unicode_escaped_string(&raw))
        } else {
            Ok(raw)
        }
    }
}

fn diagnostic(message: String) -> Event {
    Event::Error(ApiError::new(
        message,
        error_code::UNKNOWN_ID,
        error_code::NO_VALID_ID,
    ))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Decode one framed message at the given server version.
    pub fn decode(server_version: i32, items: &[&str]) -> Vec<Event> {
        let mut decoder = Decoder::new();
        decoder.enqueue_message(tokens(items));
        let mut out = Vec::new();
        decoder.process(server_version, &mut out).unwrap();
        out
    }

    /// Decode one framed message that must produce exactly one event.
    pub fn decode_one(server_version: i32, items: &[&str]) -> Event {
        let mut events = decode(server_version, items);
        assert_eq!(events.len(), 1, "expected one event, got {events:?}");
        events.remove(0)
    }

    pub fn error_message(event: &Event) -> &str {
        match event {
            Event::Error(err) => &err.message,
            other => panic!("expected error event, got {other:?}"),
        }
    }
}
