//! TWS wire constants and capture framing.
//!
//! On the wire every message is length-prefixed:
//!   [4-byte big-endian length][payload]
//! and the payload is a sequence of NUL-terminated fields. Capture files used
//! for offline replay store frames in exactly this shape.

use std::io::{self, Read, Write};

/// Write one length-prefixed frame.
pub fn write_frame<S: AsRef<str>>(writer: &mut impl Write, fields: &[S]) -> io::Result<()> {
    let mut payload = Vec::new();
    for field in fields {
        payload.extend_from_slice(field.as_ref().as_bytes());
        payload.push(0);
    }
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds 4 GiB"))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()
}

/// Largest payload the gateway will put in one frame.
pub const MAX_FRAME_LEN: usize = 0x00FF_FFFF;

/// Read one length-prefixed frame.
/// Returns `None` on a clean end of stream between frames. A length prefix
/// cut short, a payload cut short, or a length above [`MAX_FRAME_LEN`] is an error.
pub fn read_frame(reader: &mut impl Read) -> io::Result<Option<Vec<String>>> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("length prefix cut short after {filled} bytes"),
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds {MAX_FRAME_LEN}"),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    let mut fields = Vec::new();
    let mut start = 0;
    for (i, &b) in payload.iter().enumerate() {
        if b == 0 {
            fields.push(String::from_utf8_lossy(&payload[start..i]).into_owned());
            start = i + 1;
        }
    }

    Ok(Some(fields))
}

/// Incoming message type ids.
pub mod in_msg {
    pub const TICK_PRICE: i32 = 1;
    pub const TICK_SIZE: i32 = 2;
    pub const ORDER_STATUS: i32 = 3;
    pub const ERR_MSG: i32 = 4;
    pub const OPEN_ORDER: i32 = 5;
    pub const ACCT_VALUE: i32 = 6;
    pub const PORTFOLIO_VALUE: i32 = 7;
    pub const ACCT_UPDATE_TIME: i32 = 8;
    pub const NEXT_VALID_ID: i32 = 9;
    pub const CONTRACT_DATA: i32 = 10;
    pub const EXECUTION_DATA: i32 = 11;
    pub const MARKET_DEPTH: i32 = 12;
    pub const MARKET_DEPTH_L2: i32 = 13;
    pub const NEWS_BULLETINS: i32 = 14;
    pub const MANAGED_ACCTS: i32 = 15;
    pub const RECEIVE_FA: i32 = 16;
    pub const HISTORICAL_DATA: i32 = 17;
    pub const BOND_CONTRACT_DATA: i32 = 18;
    pub const SCANNER_PARAMETERS: i32 = 19;
    pub const SCANNER_DATA: i32 = 20;
    pub const TICK_OPTION_COMPUTATION: i32 = 21;
    pub const TICK_GENERIC: i32 = 45;
    pub const TICK_STRING: i32 = 46;
    pub const TICK_EFP: i32 = 47;
    pub const CURRENT_TIME: i32 = 49;
    pub const REAL_TIME_BARS: i32 = 50;
    pub const FUNDAMENTAL_DATA: i32 = 51;
    pub const CONTRACT_DATA_END: i32 = 52;
    pub const OPEN_ORDER_END: i32 = 53;
    pub const ACCT_DOWNLOAD_END: i32 = 54;
    pub const EXECUTION_DATA_END: i32 = 55;
    pub const DELTA_NEUTRAL_VALIDATION: i32 = 56;
    pub const TICK_SNAPSHOT_END: i32 = 57;
    pub const MARKET_DATA_TYPE: i32 = 58;
    pub const COMMISSION_REPORT: i32 = 59;
    pub const POSITION: i32 = 61;
    pub const POSITION_END: i32 = 62;
    pub const ACCOUNT_SUMMARY: i32 = 63;
    pub const ACCOUNT_SUMMARY_END: i32 = 64;
    pub const VERIFY_MESSAGE_API: i32 = 65;
    pub const VERIFY_COMPLETED: i32 = 66;
    pub const DISPLAY_GROUP_LIST: i32 = 67;
    pub const DISPLAY_GROUP_UPDATED: i32 = 68;
    pub const VERIFY_AND_AUTH_MESSAGE_API: i32 = 69;
    pub const VERIFY_AND_AUTH_COMPLETED: i32 = 70;
    pub const POSITION_MULTI: i32 = 71;
    pub const POSITION_MULTI_END: i32 = 72;
    pub const ACCOUNT_UPDATE_MULTI: i32 = 73;
    pub const ACCOUNT_UPDATE_MULTI_END: i32 = 74;
    pub const SECURITY_DEFINITION_OPTION_PARAMETER: i32 = 75;
    pub const SECURITY_DEFINITION_OPTION_PARAMETER_END: i32 = 76;
    pub const SOFT_DOLLAR_TIERS: i32 = 77;
    pub const FAMILY_CODES: i32 = 78;
    pub const SYMBOL_SAMPLES: i32 = 79;
    pub const MKT_DEPTH_EXCHANGES: i32 = 80;
    pub const TICK_REQ_PARAMS: i32 = 81;
    pub const SMART_COMPONENTS: i32 = 82;
    pub const NEWS_ARTICLE: i32 = 83;
    pub const TICK_NEWS: i32 = 84;
    pub const NEWS_PROVIDERS: i32 = 85;
    pub const HISTORICAL_NEWS: i32 = 86;
    pub const HISTORICAL_NEWS_END: i32 = 87;
    pub const HEAD_TIMESTAMP: i32 = 88;
    pub const HISTOGRAM_DATA: i32 = 89;
    pub const HISTORICAL_DATA_UPDATE: i32 = 90;
    pub const REROUTE_MKT_DATA: i32 = 91;
    pub const REROUTE_MKT_DEPTH: i32 = 92;
    pub const MARKET_RULE: i32 = 93;
    pub const PNL: i32 = 94;
    pub const PNL_SINGLE: i32 = 95;
    pub const HISTORICAL_TICKS: i32 = 96;
    pub const HISTORICAL_TICKS_BID_ASK: i32 = 97;
    pub const HISTORICAL_TICKS_LAST: i32 = 98;
    pub const TICK_BY_TICK: i32 = 99;
    pub const ORDER_BOUND: i32 = 100;
    pub const COMPLETED_ORDER: i32 = 101;
    pub const COMPLETED_ORDERS_END: i32 = 102;

    /// Registry name of a message id, used in decode diagnostics.
    pub fn name(id: i32) -> &'static str {
        match id {
            TICK_PRICE => "TICK_PRICE",
            TICK_SIZE => "TICK_SIZE",
            ORDER_STATUS => "ORDER_STATUS",
            ERR_MSG => "ERR_MSG",
            OPEN_ORDER => "OPEN_ORDER",
            ACCT_VALUE => "ACCT_VALUE",
            PORTFOLIO_VALUE => "PORTFOLIO_VALUE",
            ACCT_UPDATE_TIME => "ACCT_UPDATE_TIME",
            NEXT_VALID_ID => "NEXT_VALID_ID",
            CONTRACT_DATA => "CONTRACT_DATA",
            EXECUTION_DATA => "EXECUTION_DATA",
            MARKET_DEPTH => "MARKET_DEPTH",
            MARKET_DEPTH_L2 => "MARKET_DEPTH_L2",
            NEWS_BULLETINS => "NEWS_BULLETINS",
            MANAGED_ACCTS => "MANAGED_ACCTS",
            RECEIVE_FA => "RECEIVE_FA",
            HISTORICAL_DATA => "HISTORICAL_DATA",
            BOND_CONTRACT_DATA => "BOND_CONTRACT_DATA",
            SCANNER_PARAMETERS => "SCANNER_PARAMETERS",
            SCANNER_DATA => "SCANNER_DATA",
            TICK_OPTION_COMPUTATION => "TICK_OPTION_COMPUTATION",
            TICK_GENERIC => "TICK_GENERIC",
            TICK_STRING => "TICK_STRING",
            TICK_EFP => "TICK_EFP",
            CURRENT_TIME => "CURRENT_TIME",
            REAL_TIME_BARS => "REAL_TIME_BARS",
            FUNDAMENTAL_DATA => "FUNDAMENTAL_DATA",
            CONTRACT_DATA_END => "CONTRACT_DATA_END",
            OPEN_ORDER_END => "OPEN_ORDER_END",
            ACCT_DOWNLOAD_END => "ACCT_DOWNLOAD_END",
            EXECUTION_DATA_END => "EXECUTION_DATA_END",
            DELTA_NEUTRAL_VALIDATION => "DELTA_NEUTRAL_VALIDATION",
            TICK_SNAPSHOT_END => "TICK_SNAPSHOT_END",
            MARKET_DATA_TYPE => "MARKET_DATA_TYPE",
            COMMISSION_REPORT => "COMMISSION_REPORT",
            POSITION => "POSITION",
            POSITION_END => "POSITION_END",
            ACCOUNT_SUMMARY => "ACCOUNT_SUMMARY",
            ACCOUNT_SUMMARY_END => "ACCOUNT_SUMMARY_END",
            VERIFY_MESSAGE_API => "VERIFY_MESSAGE_API",
            VERIFY_COMPLETED => "VERIFY_COMPLETED",
            DISPLAY_GROUP_LIST => "DISPLAY_GROUP_LIST",
            DISPLAY_GROUP_UPDATED => "DISPLAY_GROUP_UPDATED",
            VERIFY_AND_AUTH_MESSAGE_API => "VERIFY_AND_AUTH_MESSAGE_API",
            VERIFY_AND_AUTH_COMPLETED => "VERIFY_AND_AUTH_COMPLETED",
            POSITION_MULTI => "POSITION_MULTI",
            POSITION_MULTI_END => "POSITION_MULTI_END",
            ACCOUNT_UPDATE_MULTI => "ACCOUNT_UPDATE_MULTI",
            ACCOUNT_UPDATE_MULTI_END => "ACCOUNT_UPDATE_MULTI_END",
            SECURITY_DEFINITION_OPTION_PARAMETER => "SECURITY_DEFINITION_OPTION_PARAMETER",
            SECURITY_DEFINITION_OPTION_PARAMETER_END => "SECURITY_DEFINITION_OPTION_PARAMETER_END",
            SOFT_DOLLAR_TIERS => "SOFT_DOLLAR_TIERS",
            FAMILY_CODES => "FAMILY_CODES",
            SYMBOL_SAMPLES => "SYMBOL_SAMPLES",
            MKT_DEPTH_EXCHANGES => "MKT_DEPTH_EXCHANGES",
            TICK_REQ_PARAMS => "TICK_REQ_PARAMS",
            SMART_COMPONENTS => "SMART_COMPONENTS",
            NEWS_ARTICLE => "NEWS_ARTICLE",
            TICK_NEWS => "TICK_NEWS",
            NEWS_PROVIDERS => "NEWS_PROVIDERS",
            HISTORICAL_NEWS => "HISTORICAL_NEWS",
            HISTORICAL_NEWS_END => "HISTORICAL_NEWS_END",
            HEAD_TIMESTAMP => "HEAD_TIMESTAMP",
            HISTOGRAM_DATA => "HISTOGRAM_DATA",
            HISTORICAL_DATA_UPDATE => "HISTORICAL_DATA_UPDATE",
            REROUTE_MKT_DATA => "REROUTE_MKT_DATA",
            REROUTE_MKT_DEPTH => "REROUTE_MKT_DEPTH",
            MARKET_RULE => "MARKET_RULE",
            PNL => "PNL",
            PNL_SINGLE => "PNL_SINGLE",
            HISTORICAL_TICKS => "HISTORICAL_TICKS",
            HISTORICAL_TICKS_BID_ASK => "HISTORICAL_TICKS_BID_ASK",
            HISTORICAL_TICKS_LAST => "HISTORICAL_TICKS_LAST",
            TICK_BY_TICK => "TICK_BY_TICK",
            ORDER_BOUND => "ORDER_BOUND",
            COMPLETED_ORDER => "COMPLETED_ORDER",
            COMPLETED_ORDERS_END => "COMPLETED_ORDERS_END",
            _ => "UNKNOWN",
        }
    }
}

/// Server versions at which optional fields appear.
pub mod min_server_ver {
    pub const PTA_ORDERS: i32 = 39;
    pub const FRACTIONAL_POSITIONS: i32 = 101;
    pub const PEGGED_TO_BENCHMARK: i32 = 102;
    pub const MODELS_SUPPORT: i32 = 103;
    pub const SOFT_DOLLAR_TIER: i32 = 106;
    pub const PAST_LIMIT: i32 = 109;
    pub const MD_SIZE_MULTIPLIER: i32 = 110;
    pub const CASH_QTY: i32 = 111;
    pub const SERVICE_DATA_TYPE: i32 = 120;
    pub const AGG_GROUP: i32 = 121;
    pub const UNDERLYING_INFO: i32 = 122;
    pub const SYNT_REALTIME_BARS: i32 = 124;
    pub const MARKET_RULES: i32 = 126;
    pub const UNREALIZED_PNL: i32 = 129;
    pub const MARKET_CAP_PRICE: i32 = 131;
    pub const PRE_OPEN_BID_ASK: i32 = 132;
    pub const REAL_EXPIRATION_DATE: i32 = 134;
    pub const REALIZED_PNL: i32 = 135;
    pub const LAST_LIQUIDITY: i32 = 136;
    pub const AUTO_PRICE_FOR_HEDGE: i32 = 141;
    pub const WHAT_IF_EXT_FIELDS: i32 = 142;
    pub const ORDER_CONTAINER: i32 = 145;
    pub const SMART_DEPTH: i32 = 146;
    pub const D_PEG_ORDERS: i32 = 148;
    pub const PRICE_MGMT_ALGO: i32 = 151;
    pub const ENCODE_MSG_ASCII7: i32 = 153;
    pub const FRACTIONAL_SIZE_SUPPORT: i32 = 163;
    pub const ADVANCED_ORDER_REJECT: i32 = 166;
}

/// Tick type IDs.
pub mod tick_type {
    pub const BID_SIZE: i32 = 0;
    pub const BID: i32 = 1;
    pub const ASK: i32 = 2;
    pub const ASK_SIZE: i32 = 3;
    pub const LAST: i32 = 4;
    pub const LAST_SIZE: i32 = 5;
    pub const VOLUME: i32 = 8;
    pub const CLOSE: i32 = 9;
    pub const MODEL_OPTION: i32 = 13;
    pub const DELAYED_BID: i32 = 66;
    pub const DELAYED_ASK: i32 = 67;
    pub const DELAYED_LAST: i32 = 68;
    pub const DELAYED_BID_SIZE: i32 = 69;
    pub const DELAYED_ASK_SIZE: i32 = 70;
    pub const DELAYED_LAST_SIZE: i32 = 71;
    pub const DELAYED_CLOSE: i32 = 75;
    pub const DELAYED_MODEL_OPTION: i32 = 83;

    /// Size tick type reported alongside a price tick, if any.
    pub fn size_companion(price_tick: i32) -> Option<i32> {
        match price_tick {
            BID => Some(BID_SIZE),
            ASK => Some(ASK_SIZE),
            LAST => Some(LAST_SIZE),
            DELAYED_BID => Some(DELAYED_BID_SIZE),
            DELAYED_ASK => Some(DELAYED_ASK_SIZE),
            DELAYED_LAST => Some(DELAYED_LAST_SIZE),
            _ => None,
        }
    }
}

/// Error codes used on the error channel.
pub mod error_code {
    /// Request id meaning "not tied to a request".
    pub const NO_VALID_ID: i32 = -1;
    pub const ALREADY_CONNECTED: i32 = 501;
    pub const CONNECT_FAIL: i32 = 502;
    pub const NOT_CONNECTED: i32 = 504;
    pub const UNKNOWN_ID: i32 = 505;
    pub const BAD_LENGTH: i32 = 507;
    pub const BAD_MESSAGE: i32 = 508;
    pub const FAIL_SEND: i32 = 509;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &["9", "1", "42"]).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let fields = read_frame(&mut cursor).unwrap();
        assert_eq!(fields, Some(vec!["9".to_string(), "1".into(), "42".into()]));
        assert_eq!(read_frame(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_empty_fields_survive_framing() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &["1", "", "3"]).unwrap();
        assert_eq!(&buf[..4], &5u32.to_be_bytes());

        let fields = read_frame(&mut std::io::Cursor::new(buf)).unwrap().unwrap();
        assert_eq!(fields, vec!["1", "", "3"]);
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &["hello"]).unwrap();
        buf.truncate(buf.len() - 2);
        assert!(read_frame(&mut std::io::Cursor::new(buf)).is_err());
    }

    #[test]
    fn test_partial_length_prefix_is_an_error() {
        let err = read_frame(&mut std::io::Cursor::new(vec![0u8, 0])).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        assert_eq!(read_frame(&mut std::io::Cursor::new(Vec::new())).unwrap(), None);
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let mut buf = (MAX_FRAME_LEN as u32 + 1).to_be_bytes().to_vec();
        buf.extend_from_slice(b"x\0");
        let err = read_frame(&mut std::io::Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_message_names() {
        assert_eq!(in_msg::name(in_msg::TICK_PRICE), "TICK_PRICE");
        assert_eq!(in_msg::name(in_msg::COMPLETED_ORDERS_END), "COMPLETED_ORDERS_END");
        assert_eq!(in_msg::name(4242), "UNKNOWN");
    }

    #[test]
    fn test_size_companions() {
        assert_eq!(tick_type::size_companion(tick_type::BID), Some(tick_type::BID_SIZE));
        assert_eq!(tick_type::size_companion(tick_type::ASK), Some(tick_type::ASK_SIZE));
        assert_eq!(tick_type::size_companion(tick_type::LAST), Some(tick_type::LAST_SIZE));
        assert_eq!(
            tick_type::size_companion(tick_type::DELAYED_LAST),
            Some(tick_type::DELAYED_LAST_SIZE)
        );
        assert_eq!(tick_type::size_companion(tick_type::CLOSE), None);
        assert_eq!(tick_type::size_companion(tick_type::DELAYED_CLOSE), None);
    }
}
