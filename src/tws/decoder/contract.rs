use super::Decoder;
use crate::error::DecodeResult;
use crate::models::*;
use crate::tws::events::Event;
use crate::tws::messages::min_server_ver;
use crate::tws::scalar::ScalarReader;

impl Decoder {
    /// Split the combined "date [time [zone]]" field. Bonds carry the date as
    /// their maturity and may append a time zone.
    pub(super) fn read_last_trade_date(
        &mut self,
        details: &mut ContractDetails,
        is_bond: bool,
    ) -> DecodeResult<()> {
        let raw = self.read_string()?;
        let mut parts = raw.split_whitespace();

        if let Some(date) = parts.next() {
            if is_bond {
                details.maturity = date.to_string();
            } else {
                details.contract.last_trade_date_or_contract_month = date.to_string();
            }
        }
        if let Some(time) = parts.next() {
            details.last_trade_time = time.to_string();
        }
        if is_bond {
            if let Some(zone) = parts.next() {
                details.time_zone_id = zone.to_string();
            }
        }
        Ok(())
    }

    fn read_sec_id_list(&mut self) -> DecodeResult<Vec<TagValue>> {
        self.read_list(|d| {
            Ok(TagValue {
                tag: d.read_string()?,
                value: d.read_string()?,
            })
        })
    }

    pub(super) fn decode_contract_data(&mut self) -> DecodeResult<()> {
        let version = self.read_int()?;
        let req_id = if version >= 3 { self.read_int()? } else { -1 };
        let sv = self.server_version;

        let mut details = ContractDetails::default();
        details.contract.symbol = self.read_string()?;
        details.contract.sec_type = self.read_string()?;
        self.read_last_trade_date(&mut details, false)?;
        details.contract.strike = self.read_double()?;
        details.contract.right = self.read_string()?;
        details.contract.exchange = self.read_string()?;
        details.contract.currency = self.read_string()?;
        details.contract.local_symbol = self.read_string()?;
        details.market_name = self.read_string()?;
        details.contract.trading_class = self.read_string()?;
        details.contract.con_id = self.read_int()?;
        details.min_tick = self.read_double()?;
        if sv >= min_server_ver::MD_SIZE_MULTIPLIER {
            details.md_size_multiplier = Some(self.read_int()?);
        }
        details.contract.multiplier = self.read_string()?;
        details.order_types = self.read_string()?;
        details.valid_exchanges = self.read_string()?;
        if version >= 2 {
            details.price_magnifier = self.read_int()?;
        }
        if version >= 4 {
            details.under_con_id = self.read_int()?;
        }
        if version >= 5 {
            details.long_name = self.read_long_text()?;
            details.contract.primary_exch = self.read_string()?;
        }
        if version >= 6 {
            details.contract_month = self.read_string()?;
            details.industry = self.read_string()?;
            details.category = self.read_string()?;
            details.subcategory = self.read_string()?;
            details.time_zone_id = self.read_string()?;
            details.trading_hours = self.read_string()?;
            details.liquid_hours = self.read_string()?;
        }
        if version >= 8 {
            details.ev_rule = self.read_string()?;
            details.ev_multiplier = self.read_double()?;
        }
        if version >= 7 {
            details.sec_id_list = self.read_sec_id_list()?;
        }
        if sv >= min_server_ver::AGG_GROUP {
            details.agg_group = Some(self.read_int()?);
        }
        if sv >= min_server_ver::UNDERLYING_INFO {
            details.under_symbol = self.read_string()?;
            details.under_sec_type = self.read_string()?;
        }
        if sv >= min_server_ver::MARKET_RULES {
            details.market_rule_ids = self.read_string()?;
        }
        if sv >= min_server_ver::REAL_EXPIRATION_DATE {
            details.real_expiration_date = self.read_string()?;
        }

        self.emit(Event::ContractDetails { req_id, details });
        Ok(())
    }

    pub(super) fn decode_bond_contract_data(&mut self) -> DecodeResult<()> {
        let version = self.read_int()?;
        let req_id = if version >= 3 { self.read_int()? } else { -1 };
        let sv = self.server_version;

        let mut details = ContractDetails::default();
        details.contract.symbol = self.read_string()?;
        details.contract.sec_type = self.read_string()?;
        details.cusip = self.read_string()?;
        details.coupon = self.read_double()?;
        self.read_last_trade_date(&mut details, true)?;
        details.issue_date = self.read_string()?;
        details.ratings = self.read_string()?;
        details.bond_type = self.read_string()?;
        details.coupon_type = self.read_string()?;
        details.convertible = self.read_bool()?;
        details.callable = self.read_bool()?;
        details.putable = self.read_bool()?;
        details.desc_append = self.read_long_text()?;
        details.contract.exchange = self.read_string()?;
        details.contract.currency = self.read_string()?;
        details.market_name = self.read_string()?;
        details.contract.trading_class = self.read_string()?;
        details.contract.con_id = self.read_int()?;
        details.min_tick = self.read_double()?;
        if sv >= min_server_ver::MD_SIZE_MULTIPLIER {
            details.md_size_multiplier = Some(self.read_int()?);
        }
        details.order_types = self.read_string()?;
        details.valid_exchanges = self.read_string()?;
        if version >= 2 {
            details.next_option_date = self.read_string()?;
            details.next_option_type = self.read_string()?;
            details.next_option_partial = self.read_bool()?;
            details.notes = self.read_string()?;
        }
        if version >= 4 {
            details.long_name = self.read_long_text()?;
        }
        if version >= 6 {
            details.ev_rule = self.read_string()?;
            details.ev_multiplier = self.read_double()?;
        }
        if version >= 5 {
            details.sec_id_list = self.read_sec_id_list()?;
        }
        if sv >= min_server_ver::AGG_GROUP {
            details.agg_group = Some(self.read_int()?);
        }
        if sv >= min_server_ver::MARKET_RULES {
            details.market_rule_ids = self.read_string()?;
        }

        self.emit(Event::BondContractDetails { req_id, details });
        Ok(())
    }

    pub(super) fn decode_contract_data_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        self.emit(Event::ContractDetailsEnd { req_id });
        Ok(())
    }

    pub(super) fn decode_delta_neutral_validation(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let contract = DeltaNeutralContract {
            con_id: self.read_int()?,
            delta: self.read_double()?,
            price: self.read_double()?,
        };
        self.emit(Event::DeltaNeutralValidation { req_id, contract });
        Ok(())
    }

    pub(super) fn decode_security_definition_option_parameter(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let exchange = self.read_string()?;
        let underlying_con_id = self.read_int()?;
        let trading_class = self.read_string()?;
        let multiplier = self.read_string()?;
        let expirations = self.read_list(|d| d.read_string())?;
        let strikes = self.read_list(|d| d.read_double())?;
        self.emit(Event::SecurityDefinitionOptionParameter {
            req_id,
            exchange,
            underlying_con_id,
            trading_class,
            multiplier,
            expirations,
            strikes,
        });
        Ok(())
    }

    pub(super) fn decode_security_definition_option_parameter_end(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        self.emit(Event::SecurityDefinitionOptionParameterEnd { req_id });
        Ok(())
    }

    pub(super) fn decode_symbol_samples(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let descriptions = self.read_list(|d| {
            let contract = Contract {
                con_id: d.read_int()?,
                symbol: d.read_string()?,
                sec_type: d.read_string()?,
                primary_exch: d.read_string()?,
                currency: d.read_string()?,
                ..Default::default()
            };
            let derivative_sec_types = d.read_list(|d| d.read_string())?;
            Ok(ContractDescription { contract, derivative_sec_types })
        })?;
        self.emit(Event::SymbolSamples { req_id, descriptions });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn contract_data_tokens() -> Vec<&'static str> {
        vec![
            "10", "8", "42",
            "ES", "FUT", "20240315 09:30", "0", "", "CME", "USD", "ESH4", "ES", "ES",
            "495512552", "0.25", "1", "50", "LMT,MKT", "CME,GLOBEX",
            "1", "11004968",
            "E-mini S&P 500", "CME",
            "202403", "", "", "", "US/Central", "hours", "liquid",
            "", "0",
            "1", "ISIN", "US000",
            "2",
            "ES", "IND",
            "67,67",
            "20240315",
        ]
    }

    #[test]
    fn test_contract_data_modern_layout() {
        let event = decode_one(176, &contract_data_tokens());
        let Event::ContractDetails { req_id, details } = event else { panic!() };
        assert_eq!(req_id, 42);
        assert_eq!(details.contract.last_trade_date_or_contract_month, "20240315");
        assert_eq!(details.last_trade_time, "09:30");
        assert_eq!(details.contract.con_id, 495512552);
        assert_eq!(details.md_size_multiplier, Some(1));
        assert_eq!(details.contract.multiplier, "50");
        assert_eq!(details.contract.primary_exch, "CME");
        assert_eq!(details.time_zone_id, "US/Central");
        assert_eq!(details.sec_id_list, vec![TagValue { tag: "ISIN".into(), value: "US000".into() }]);
        assert_eq!(details.agg_group, Some(2));
        assert_eq!(details.under_sec_type, "IND");
        assert_eq!(details.market_rule_ids, "67,67");
        assert_eq!(details.real_expiration_date, "20240315");
    }

    #[test]
    fn test_contract_long_name_is_unescaped() {
        let mut tokens = contract_data_tokens();
        tokens[21] = r"Soci\u00e9t\u00e9 G\u00e9n\u00e9rale";
        let Event::ContractDetails { details, .. } = decode_one(176, &tokens) else { panic!() };
        assert_eq!(details.long_name, "Société Générale");

        let Event::ContractDetails { details, .. } = decode_one(150, &legacy_contract_tokens())
        else {
            panic!()
        };
        assert_eq!(details.long_name, r"Soci\u00e9t\u00e9");
    }

    /// Contract data as a server below the escaped-text feature sends it.
    fn legacy_contract_tokens() -> Vec<&'static str> {
        vec![
            "10", "8", "42",
            "GLE", "STK", "", "0", "", "SBF", "EUR", "GLE", "GLE", "GLE",
            "12087", "0.005", "1", "", "LMT", "SBF",
            "1", "0",
            r"Soci\u00e9t\u00e9", "SBF",
            "", "", "", "", "MET", "", "",
            "", "0",
            "0",
            "1",
            "", "",
            "",
            "",
        ]
    }

    #[test]
    fn test_bond_long_text_fields_are_unescaped() {
        let event = decode_one(
            176,
            &[
                "18", "6", "7",
                "BNP", "BOND", "FR00", "2.5", "20301101", "20201101", "AA", "FIXED",
                "FIXED", "0", "0", "0", r"Obligation \u00e0 taux fixe", "SMART", "EUR", "BNP", "BNP",
                "555", "0.001", "1", "LMT", "SMART",
                "", "", "0", "",
                r"BNP Paribas S\u00e9rie 1",
                "", "0",
                "0",
                "4",
                "26",
            ],
        );
        let Event::BondContractDetails { req_id, details } = event else { panic!() };
        assert_eq!(req_id, 7);
        assert_eq!(details.desc_append, "Obligation à taux fixe");
        assert_eq!(details.long_name, "BNP Paribas Série 1");
        assert_eq!(details.agg_group, Some(4));
        assert_eq!(details.market_rule_ids, "26");
    }

    #[test]
    fn test_bond_maturity_split() {
        let event = decode_one(
            100,
            &[
                "18", "1",
                "IBM", "BOND", "459200AM3", "7.0", "20251101 16:00 EST", "19951101", "A", "FIXED",
                "FIXED", "0", "1", "0", "", "SMART", "USD", "IBM", "IBM", "12345", "0.001",
                "LMT", "SMART",
            ],
        );
        let Event::BondContractDetails { req_id, details } = event else { panic!() };
        assert_eq!(req_id, -1);
        assert_eq!(details.maturity, "20251101");
        assert_eq!(details.last_trade_time, "16:00");
        assert_eq!(details.time_zone_id, "EST");
        assert!(details.callable);
        assert!(!details.convertible);
        assert_eq!(details.md_size_multiplier, None);
    }

    #[test]
    fn test_security_definition_option_parameter() {
        let event = decode_one(
            176,
            &["75", "5", "SMART", "265598", "AAPL", "100", "2", "20240119", "20240216", "3", "100", "105", "110"],
        );
        assert_eq!(
            event,
            Event::SecurityDefinitionOptionParameter {
                req_id: 5,
                exchange: "SMART".into(),
                underlying_con_id: 265598,
                trading_class: "AAPL".into(),
                multiplier: "100".into(),
                expirations: vec!["20240119".into(), "20240216".into()],
                strikes: vec![100.0, 105.0, 110.0],
            }
        );
    }

    #[test]
    fn test_symbol_samples_with_derivatives() {
        let event = decode_one(
            176,
            &["79", "3", "1", "265598", "AAPL", "STK", "NASDAQ", "USD", "2", "OPT", "WAR"],
        );
        let Event::SymbolSamples { req_id, descriptions } = event else { panic!() };
        assert_eq!(req_id, 3);
        assert_eq!(descriptions[0].contract.primary_exch, "NASDAQ");
        assert_eq!(descriptions[0].derivative_sec_types, vec!["OPT", "WAR"]);
    }

    #[test]
    fn test_delta_neutral_validation_and_ends() {
        assert_eq!(
            decode_one(176, &["56", "1", "3", "11004968", "0.45", "4500.25"]),
            Event::DeltaNeutralValidation {
                req_id: 3,
                contract: DeltaNeutralContract { con_id: 11004968, delta: 0.45, price: 4500.25 },
            }
        );
        assert_eq!(decode_one(176, &["52", "1", "42"]), Event::ContractDetailsEnd { req_id: 42 });
        assert_eq!(
            decode_one(176, &["76", "42"]),
            Event::SecurityDefinitionOptionParameterEnd { req_id: 42 }
        );
    }
}
