use tracing::debug;

use super::Decoder;
use crate::error::DecodeResult;
use crate::models::*;
use crate::tws::events::{ApiError, Event};
use crate::tws::messages::{error_code, min_server_ver};
use crate::tws::scalar::{ScalarReader, decode_unicode_escaped_string};

/// Undo the escaping applied to the advanced-reject JSON blob, then parse it.
/// Anything that still fails to parse is kept as a plain string.
fn parse_advanced_reject(raw: &str) -> serde_json::Value {
    let unescaped = decode_unicode_escaped_string(raw);
    serde_json::from_str(&unescaped).unwrap_or(serde_json::Value::String(unescaped))
}

impl Decoder {
    pub(super) fn decode_err_msg(&mut self) -> DecodeResult<()> {
        let version = self.read_int()?;
        if version < 2 {
            let message = self.read_string()?;
            self.emit(Event::Error(ApiError::new(
                message,
                error_code::NO_VALID_ID,
                error_code::NO_VALID_ID,
            )));
            return Ok(());
        }

        let req_id = self.read_int()?;
        let code = self.read_int()?;
        let message = self.read_long_text()?;

        let mut advanced_order_reject = None;
        if self.server_version >= min_server_ver::ADVANCED_ORDER_REJECT {
            let raw = self.read_string()?;
            if !raw.is_empty() {
                advanced_order_reject = Some(parse_advanced_reject(&raw));
            }
        }

        if req_id == error_code::NO_VALID_ID {
            debug!(code, %message, "server notice");
            self.emit(Event::Info { message, code });
        } else {
            self.emit(Event::Error(ApiError {
                message,
                code,
                req_id,
                advanced_order_reject,
            }));
        }
        Ok(())
    }

    pub(super) fn decode_acct_value(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let key = self.read_string()?;
        let value = self.read_string()?;
        let currency = self.read_string()?;
        let account_name = self.read_string()?;
        self.emit(Event::UpdateAccountValue { key, value, currency, account_name });
        Ok(())
    }

    pub(super) fn decode_portfolio_value(&mut self) -> DecodeResult<()> {
        let version = self.read_int()?;

        let mut contract = Contract::default();
        if version >= 6 {
            contract.con_id = self.read_int()?;
        }
        contract.symbol = self.read_string()?;
        contract.sec_type = self.read_string()?;
        contract.last_trade_date_or_contract_month = self.read_string()?;
        contract.strike = self.read_double()?;
        contract.right = self.read_string()?;
        if version >= 7 {
            contract.multiplier = self.read_string()?;
            contract.primary_exch = self.read_string()?;
        }
        contract.currency = self.read_string()?;
        if version >= 2 {
            contract.local_symbol = self.read_string()?;
        }
        if version >= 8 {
            contract.trading_class = self.read_string()?;
        }

        let position = self.read_decimal()?;
        let market_price = self.read_double()?;
        let market_value = self.read_double()?;
        let (mut average_cost, mut unrealized_pnl, mut realized_pnl) = (None, None, None);
        if version >= 3 {
            average_cost = Some(self.read_double()?);
            unrealized_pnl = Some(self.read_double()?);
            realized_pnl = Some(self.read_double()?);
        }
        let account_name = if version >= 4 { self.read_string()? } else { String::new() };
        if version == 6 && self.server_version == min_server_ver::PTA_ORDERS {
            contract.primary_exch = self.read_string()?;
        }

        self.emit(Event::UpdatePortfolio {
            contract,
            position,
            market_price,
            market_value,
            average_cost,
            unrealized_pnl,
            realized_pnl,
            account_name,
        });
        Ok(())
    }

    pub(super) fn decode_acct_update_time(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let time_stamp = self.read_string()?;
        self.emit(Event::UpdateAccountTime { time_stamp });
        Ok(())
    }

    pub(super) fn decode_acct_download_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let account_name = self.read_string()?;
        self.emit(Event::AccountDownloadEnd { account_name });
        Ok(())
    }

    pub(super) fn decode_next_valid_id(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let order_id = self.read_int()?;
        self.emit(Event::NextValidId { order_id });
        Ok(())
    }

    pub(super) fn decode_managed_accts(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let accounts = self.read_string()?;
        self.emit(Event::ManagedAccounts { accounts });
        Ok(())
    }

    pub(super) fn decode_receive_fa(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let fa_data_type = self.read_int()?;
        let xml = self.read_string()?;
        self.emit(Event::ReceiveFa { fa_data_type, xml });
        Ok(())
    }

    pub(super) fn decode_execution_data(&mut self) -> DecodeResult<()> {
        let version = if self.server_version < min_server_ver::LAST_LIQUIDITY {
            self.read_int()?
        } else {
            self.server_version
        };
        let req_id = if version >= 7 { self.read_int()? } else { -1 };

        let mut execution = Execution { order_id: self.read_int()?, ..Default::default() };

        let mut contract = Contract::default();
        if version >= 5 {
            contract.con_id = self.read_int()?;
        }
        contract.symbol = self.read_string()?;
        contract.sec_type = self.read_string()?;
        contract.last_trade_date_or_contract_month = self.read_string()?;
        contract.strike = self.read_double()?;
        contract.right = self.read_string()?;
        if version >= 9 {
            contract.multiplier = self.read_string()?;
        }
        contract.exchange = self.read_string()?;
        contract.currency = self.read_string()?;
        contract.local_symbol = self.read_string()?;
        if version >= 10 {
            contract.trading_class = self.read_string()?;
        }

        execution.exec_id = self.read_string()?;
        execution.time = self.read_string()?;
        execution.acct_number = self.read_string()?;
        execution.exchange = self.read_string()?;
        execution.side = self.read_string()?;
        execution.shares = self.read_decimal()?;
        execution.price = self.read_double()?;
        if version >= 2 {
            execution.perm_id = self.read_int()?;
        }
        if version >= 3 {
            execution.client_id = self.read_int()?;
        }
        if version >= 4 {
            execution.liquidation = self.read_int()?;
        }
        if version >= 6 {
            execution.cum_qty = self.read_decimal()?;
            execution.avg_price = self.read_double()?;
        }
        if version >= 8 {
            execution.order_ref = self.read_string()?;
        }
        if version >= 9 {
            execution.ev_rule = self.read_string()?;
            execution.ev_multiplier = self.read_double()?;
        }
        if self.server_version >= min_server_ver::MODELS_SUPPORT {
            execution.model_code = self.read_string()?;
        }
        if self.server_version >= min_server_ver::LAST_LIQUIDITY {
            execution.last_liquidity = self.read_int()?;
        }

        self.emit(Event::ExecDetails { req_id, contract, execution });
        Ok(())
    }

    pub(super) fn decode_execution_data_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        self.emit(Event::ExecDetailsEnd { req_id });
        Ok(())
    }

    pub(super) fn decode_commission_report(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let report = CommissionReport {
            exec_id: self.read_string()?,
            commission: self.read_double()?,
            currency: self.read_string()?,
            realized_pnl: self.read_double()?,
            yield_value: self.read_double()?,
            yield_redemption_date: self.read_int()?,
        };
        self.emit(Event::CommissionReport { report });
        Ok(())
    }

    pub(super) fn decode_position(&mut self) -> DecodeResult<()> {
        let version = self.read_int()?;
        let account = self.read_string()?;

        let mut contract = Contract {
            con_id: self.read_int()?,
            symbol: self.read_string()?,
            sec_type: self.read_string()?,
            last_trade_date_or_contract_month: self.read_string()?,
            strike: self.read_double()?,
            right: self.read_string()?,
            multiplier: self.read_string()?,
            exchange: self.read_string()?,
            currency: self.read_string()?,
            local_symbol: self.read_string()?,
            ..Default::default()
        };
        if version >= 2 {
            contract.trading_class = self.read_string()?;
        }

        let position = self.read_decimal()?;
        let avg_cost = if version >= 3 { self.read_double()? } else { 0.0 };
        self.emit(Event::Position { account, contract, position, avg_cost });
        Ok(())
    }

    pub(super) fn decode_position_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        self.emit(Event::PositionEnd);
        Ok(())
    }

    pub(super) fn decode_account_summary(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let account = self.read_string()?;
        let tag = self.read_string()?;
        let value = self.read_string()?;
        let currency = self.read_string()?;
        self.emit(Event::AccountSummary { req_id, account, tag, value, currency });
        Ok(())
    }

    pub(super) fn decode_account_summary_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        self.emit(Event::AccountSummaryEnd { req_id });
        Ok(())
    }

    pub(super) fn decode_display_group_list(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let groups = self.read_string()?;
        self.emit(Event::DisplayGroupList { req_id, groups });
        Ok(())
    }

    pub(super) fn decode_display_group_updated(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let contract_info = self.read_string()?;
        self.emit(Event::DisplayGroupUpdated { req_id, contract_info });
        Ok(())
    }

    pub(super) fn decode_position_multi(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let account = self.read_string()?;
        let contract = Contract {
            con_id: self.read_int()?,
            symbol: self.read_string()?,
            sec_type: self.read_string()?,
            last_trade_date_or_contract_month: self.read_string()?,
            strike: self.read_double()?,
            right: self.read_string()?,
            multiplier: self.read_string()?,
            exchange: self.read_string()?,
            currency: self.read_string()?,
            local_symbol: self.read_string()?,
            trading_class: self.read_string()?,
            ..Default::default()
        };
        let position = self.read_decimal()?;
        let avg_cost = self.read_double()?;
        let model_code = self.read_string()?;
        self.emit(Event::PositionMulti {
            req_id,
            account,
            model_code,
            contract,
            position,
            avg_cost,
        });
        Ok(())
    }

    pub(super) fn decode_position_multi_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        self.emit(Event::PositionMultiEnd { req_id });
        Ok(())
    }

    pub(super) fn decode_account_update_multi(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        let account = self.read_string()?;
        let model_code = self.read_string()?;
        let key = self.read_string()?;
        let value = self.read_string()?;
        let currency = self.read_string()?;
        self.emit(Event::AccountUpdateMulti {
            req_id,
            account,
            model_code,
            key,
            value,
            currency,
        });
        Ok(())
    }

    pub(super) fn decode_account_update_multi_end(&mut self) -> DecodeResult<()> {
        self.read_int()?;
        let req_id = self.read_int()?;
        self.emit(Event::AccountUpdateMultiEnd { req_id });
        Ok(())
    }

    pub(super) fn decode_pnl(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let daily_pnl = self.read_double()?;
        let unrealized_pnl = if self.server_version >= min_server_ver::UNREALIZED_PNL {
            Some(self.read_double()?)
        } else {
            None
        };
        let realized_pnl = if self.server_version >= min_server_ver::REALIZED_PNL {
            Some(self.read_double()?)
        } else {
            None
        };
        self.emit(Event::Pnl { req_id, daily_pnl, unrealized_pnl, realized_pnl });
        Ok(())
    }

    pub(super) fn decode_pnl_single(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let position = self.read_decimal()?;
        let daily_pnl = self.read_double()?;
        let unrealized_pnl = if self.server_version >= min_server_ver::UNREALIZED_PNL {
            Some(self.read_double()?)
        } else {
            None
        };
        let realized_pnl = if self.server_version >= min_server_ver::REALIZED_PNL {
            Some(self.read_double()?)
        } else {
            None
        };
        let value = self.read_double()?;
        self.emit(Event::PnlSingle {
            req_id,
            position,
            daily_pnl,
            unrealized_pnl,
            realized_pnl,
            value,
        });
        Ok(())
    }

    pub(super) fn decode_family_codes(&mut self) -> DecodeResult<()> {
        let codes = self.read_list(|d| {
            Ok(FamilyCode {
                account_id: d.read_string()?,
                family_code: d.read_string()?,
            })
        })?;
        self.emit(Event::FamilyCodes { codes });
        Ok(())
    }

    pub(super) fn decode_soft_dollar_tiers(&mut self) -> DecodeResult<()> {
        let req_id = self.read_int()?;
        let tiers = self.read_list(|d| {
            Ok(SoftDollarTier {
                name: d.read_string()?,
                value: d.read_string()?,
                display_name: d.read_string()?,
            })
        })?;
        self.emit(Event::SoftDollarTiers { req_id, tiers });
        Ok(())
    }
}
