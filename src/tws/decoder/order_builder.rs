//! Progressive decoding of the order messages.
//!
//! Open orders and completed orders share one long field sequence. Each step
//! reads a group of fields into the builder, gated by the message version or
//! the server version, and some steps depend on values an earlier step read.
//! The order of [`STEPS`] is the wire order and must not be rearranged.

use crate::error::{DecodeError, DecodeResult};
use crate::models::*;
use crate::tws::messages::min_server_ver;
use crate::tws::queue::TokenQueue;
use crate::tws::scalar::{ScalarReader, UNSET_DOUBLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Open,
    Completed,
}

#[derive(Debug, Clone, Copy)]
enum Applies {
    Both,
    OpenOnly,
    CompletedOnly,
}

impl Applies {
    fn includes(self, kind: OrderKind) -> bool {
        match self {
            Applies::Both => true,
            Applies::OpenOnly => kind == OrderKind::Open,
            Applies::CompletedOnly => kind == OrderKind::Completed,
        }
    }
}

type StepFn = fn(&mut OrderBuilder<'_>) -> DecodeResult<()>;

struct Step {
    applies: Applies,
    run: StepFn,
}

const fn both(run: StepFn) -> Step {
    Step { applies: Applies::Both, run }
}

const fn open_only(run: StepFn) -> Step {
    Step { applies: Applies::OpenOnly, run }
}

const fn completed_only(run: StepFn) -> Step {
    Step { applies: Applies::CompletedOnly, run }
}

const STEPS: &[Step] = &[
    open_only(order_id),
    both(contract_fields),
    both(action_and_quantity),
    both(prices),
    both(tif_through_order_ref),
    open_only(client_id),
    both(perm_id),
    both(outside_rth),
    both(hidden_and_discretionary),
    both(good_after_time),
    open_only(skip_shares_allocation),
    both(fa_params),
    both(model_code),
    both(good_till_date),
    both(rule_80a_and_settling),
    both(short_sale_params),
    open_only(auction_strategy),
    both(box_params),
    both(peg_to_stock_range),
    both(display_size),
    open_only(old_style_outside_rth),
    open_only(block_order),
    both(sweep_all_or_none),
    both(min_qty_and_oca_type),
    open_only(legacy_exchange_flags),
    open_only(parent_id),
    both(trigger_method),
    both(vol_order_params),
    both(trail_params),
    open_only(basis_points),
    both(combo_legs),
    both(smart_combo_routing_params),
    both(scale_params),
    both(hedge_params),
    open_only(opt_out_smart_routing),
    both(clearing_params),
    both(not_held),
    both(delta_neutral),
    both(algo_params),
    both(solicited),
    open_only(what_if_and_commission),
    completed_only(order_status),
    both(vol_randomize_flags),
    both(peg_to_bench_params),
    both(conditions),
    open_only(adjusted_order_params),
    completed_only(stop_price_and_lmt_price_offset),
    open_only(soft_dollar_tier),
    both(cash_qty),
    both(dont_use_auto_price_for_hedge),
    both(is_oms_container),
    open_only(discretionary_up_to_limit_price),
    open_only(use_price_mgmt_algo),
    completed_only(completed_tail),
];

/// Shared mutable context threaded through [`STEPS`].
pub(super) struct OrderBuilder<'q> {
    reader: &'q mut TokenQueue,
    kind: OrderKind,
    version: i32,
    server_version: i32,
    contract: Contract,
    order: Order,
    order_state: OrderState,
}

impl ScalarReader for OrderBuilder<'_> {
    fn next_token(&mut self) -> DecodeResult<&str> {
        self.reader.next_token()
    }
}

impl<'q> OrderBuilder<'q> {
    pub(super) fn new(
        reader: &'q mut TokenQueue,
        kind: OrderKind,
        version: i32,
        server_version: i32,
    ) -> Self {
        Self {
            reader,
            kind,
            version,
            server_version,
            contract: Contract::default(),
            order: Order::default(),
            order_state: OrderState::default(),
        }
    }

    /// Run every step that applies to this order kind, in wire order.
    pub(super) fn run(mut self) -> DecodeResult<(Contract, Order, OrderState)> {
        for step in STEPS {
            if step.applies.includes(self.kind) {
                (step.run)(&mut self)?;
            }
        }
        Ok((self.contract, self.order, self.order_state))
    }

    fn is_open(&self) -> bool {
        self.kind == OrderKind::Open
    }

    fn read_tag_values(&mut self) -> DecodeResult<Vec<TagValue>> {
        let count = self.read_int()?;
        let mut params = Vec::new();
        for _ in 0..count {
            params.push(TagValue {
                tag: self.read_string()?,
                value: self.read_string()?,
            });
        }
        Ok(params)
    }
}

fn order_id(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    b.order.order_id = b.read_int()?;
    Ok(())
}

fn contract_fields(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 17 {
        b.contract.con_id = b.read_int()?;
    }
    b.contract.symbol = b.read_string()?;
    b.contract.sec_type = b.read_string()?;
    b.contract.last_trade_date_or_contract_month = b.read_string()?;
    b.contract.strike = b.read_double()?;
    b.contract.right = b.read_string()?;
    if b.version >= 32 {
        b.contract.multiplier = b.read_string()?;
    }
    b.contract.exchange = b.read_string()?;
    b.contract.currency = b.read_string()?;
    if b.version >= 2 {
        b.contract.local_symbol = b.read_string()?;
    }
    if b.version >= 32 {
        b.contract.trading_class = b.read_string()?;
    }
    Ok(())
}

fn action_and_quantity(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    b.order.action = b.read_string()?;
    b.order.total_quantity = b.read_decimal()?;
    b.order.order_type = b.read_string()?;
    Ok(())
}

fn prices(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    b.order.lmt_price = if b.version < 29 {
        Some(b.read_double()?)
    } else {
        b.read_double_or_absent()?
    };
    b.order.aux_price = if b.version < 30 {
        Some(b.read_double()?)
    } else {
        b.read_double_or_absent()?
    };
    Ok(())
}

fn tif_through_order_ref(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    b.order.tif = b.read_string()?;
    b.order.oca_group = b.read_string()?;
    b.order.account = b.read_string()?;
    b.order.open_close = b.read_string()?;
    b.order.origin = b.read_int()?;
    b.order.order_ref = b.read_string()?;
    Ok(())
}

fn client_id(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 3 {
        b.order.client_id = b.read_int()?;
    }
    Ok(())
}

fn perm_id(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 4 {
        b.order.perm_id = b.read_int()?;
    }
    Ok(())
}

fn outside_rth(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 4 {
        let flag = b.read_bool()?;
        // Before v18 this slot is ignoreRth; the real flag comes later.
        if b.version >= 18 {
            b.order.outside_rth = flag;
        }
    }
    Ok(())
}

fn hidden_and_discretionary(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 4 {
        b.order.hidden = b.read_int()? == 1;
        b.order.discretionary_amt = b.read_double()?;
    }
    Ok(())
}

fn good_after_time(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 5 {
        b.order.good_after_time = b.read_string()?;
    }
    Ok(())
}

fn skip_shares_allocation(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 6 {
        b.read_string()?;
    }
    Ok(())
}

fn fa_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 7 {
        b.order.fa_group = b.read_string()?;
        b.order.fa_method = b.read_string()?;
        b.order.fa_percentage = b.read_string()?;
        b.order.fa_profile = b.read_string()?;
    }
    Ok(())
}

fn model_code(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version >= min_server_ver::MODELS_SUPPORT {
        b.order.model_code = b.read_string()?;
    }
    Ok(())
}

fn good_till_date(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 8 {
        b.order.good_till_date = b.read_string()?;
    }
    Ok(())
}

fn rule_80a_and_settling(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.rule_80a = b.read_string()?;
        b.order.percent_offset = b.read_double_or_absent()?;
        b.order.settling_firm = b.read_string()?;
    }
    Ok(())
}

fn short_sale_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.short_sale_slot = b.read_int()?;
        b.order.designated_location = b.read_string()?;
        if b.server_version == 51 {
            b.read_int()?;
        } else if b.version >= 23 {
            b.order.exempt_code = b.read_int()?;
        }
    }
    Ok(())
}

fn auction_strategy(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.auction_strategy = b.read_int()?;
    }
    Ok(())
}

fn box_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.starting_price = b.read_double_or_absent()?;
        b.order.stock_ref_price = b.read_double_or_absent()?;
        b.order.delta = b.read_double_or_absent()?;
    }
    Ok(())
}

fn peg_to_stock_range(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.stock_range_lower = b.read_double_or_absent()?;
        b.order.stock_range_upper = b.read_double_or_absent()?;
    }
    Ok(())
}

fn display_size(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.display_size = b.read_int_or_absent()?;
    }
    Ok(())
}

fn old_style_outside_rth(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 && b.version < 18 {
        b.order.outside_rth = b.read_bool()?;
    }
    Ok(())
}

fn block_order(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.block_order = b.read_bool()?;
    }
    Ok(())
}

fn sweep_all_or_none(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.sweep_to_fill = b.read_bool()?;
        b.order.all_or_none = b.read_bool()?;
    }
    Ok(())
}

fn min_qty_and_oca_type(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.order.min_qty = b.read_int_or_absent()?;
        b.order.oca_type = b.read_int()?;
    }
    Ok(())
}

/// eTradeOnly, firmQuoteOnly and nbboPriceCap: still on the wire, no longer used.
fn legacy_exchange_flags(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 9 {
        b.read_bool()?;
        b.read_bool()?;
        b.read_double_or_absent()?;
    }
    Ok(())
}

fn parent_id(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 10 {
        b.order.parent_id = b.read_int()?;
    }
    Ok(())
}

fn trigger_method(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 10 {
        b.order.trigger_method = b.read_int()?;
    }
    Ok(())
}

fn vol_order_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version < 11 {
        return Ok(());
    }

    b.order.volatility = b.read_double_or_absent()?;
    b.order.volatility_type = b.read_int()?;
    if b.version == 11 {
        let received = b.read_int()?;
        b.order.delta_neutral_order_type = if received == 0 { "NONE" } else { "MKT" }.into();
    } else {
        b.order.delta_neutral_order_type = b.read_string()?;
        b.order.delta_neutral_aux_price = b.read_double_or_absent()?;

        let has_dn_type = !b.order.delta_neutral_order_type.is_empty();
        if b.version >= 27 && has_dn_type {
            b.order.delta_neutral_con_id = b.read_int()?;
            if b.is_open() {
                b.order.delta_neutral_settling_firm = b.read_string()?;
                b.order.delta_neutral_clearing_account = b.read_string()?;
                b.order.delta_neutral_clearing_intent = b.read_string()?;
            }
        }
        if b.version >= 31 && has_dn_type {
            if b.is_open() {
                b.order.delta_neutral_open_close = b.read_string()?;
            }
            b.order.delta_neutral_short_sale = b.read_bool()?;
            b.order.delta_neutral_short_sale_slot = b.read_int()?;
            b.order.delta_neutral_designated_location = b.read_string()?;
        }
    }

    b.order.continuous_update = b.read_int()?;
    if b.server_version == 26 {
        b.order.stock_range_lower = Some(b.read_double()?);
        b.order.stock_range_upper = Some(b.read_double()?);
    }
    b.order.reference_price_type = b.read_int()?;
    Ok(())
}

fn trail_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 13 {
        b.order.trail_stop_price = b.read_double_or_absent()?;
    }
    if b.version >= 30 {
        b.order.trailing_percent = b.read_double_or_absent()?;
    }
    Ok(())
}

fn basis_points(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 14 {
        b.order.basis_points = b.read_double_or_absent()?;
        b.order.basis_points_type = b.read_int_or_absent()?;
    }
    Ok(())
}

fn combo_legs(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 14 {
        b.contract.combo_legs_descrip = b.read_string()?;
    }
    if b.version >= 29 {
        let leg_count = b.read_int()?;
        for _ in 0..leg_count {
            let leg = ComboLeg {
                con_id: b.read_int()?,
                ratio: b.read_int()?,
                action: b.read_string()?,
                exchange: b.read_string()?,
                open_close: b.read_int()?,
                short_sale_slot: b.read_int()?,
                designated_location: b.read_string()?,
                exempt_code: b.read_int()?,
            };
            b.contract.combo_legs.push(leg);
        }

        let price_count = b.read_int()?;
        for _ in 0..price_count {
            let price = b.read_double_or_absent()?;
            b.order.order_combo_legs.push(OrderComboLeg { price });
        }
    }
    Ok(())
}

fn smart_combo_routing_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 26 {
        b.order.smart_combo_routing_params = b.read_tag_values()?;
    }
    Ok(())
}

fn scale_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 15 {
        if b.version >= 20 {
            b.order.scale_init_level_size = b.read_int_or_absent()?;
            b.order.scale_subs_level_size = b.read_int_or_absent()?;
        } else {
            b.read_int_or_absent()?;
            b.order.scale_init_level_size = b.read_int_or_absent()?;
        }
        b.order.scale_price_increment = b.read_double_or_absent()?;
    }

    let has_increment = b
        .order
        .scale_price_increment
        .is_some_and(|inc| inc > 0.0 && inc != UNSET_DOUBLE);
    if b.version >= 28 && has_increment {
        b.order.scale_price_adjust_value = b.read_double_or_absent()?;
        b.order.scale_price_adjust_interval = b.read_int_or_absent()?;
        b.order.scale_profit_offset = b.read_double_or_absent()?;
        b.order.scale_auto_reset = b.read_bool()?;
        b.order.scale_init_position = b.read_int_or_absent()?;
        b.order.scale_init_fill_qty = b.read_int_or_absent()?;
        b.order.scale_random_percent = b.read_bool()?;
    }
    Ok(())
}

fn hedge_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 24 {
        b.order.hedge_type = b.read_string()?;
        if !b.order.hedge_type.is_empty() {
            b.order.hedge_param = b.read_string()?;
        }
    }
    Ok(())
}

fn opt_out_smart_routing(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 25 {
        b.order.opt_out_smart_routing = b.read_bool()?;
    }
    Ok(())
}

fn clearing_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 19 {
        b.order.clearing_account = b.read_string()?;
        b.order.clearing_intent = b.read_string()?;
    }
    Ok(())
}

fn not_held(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 22 {
        b.order.not_held = b.read_bool()?;
    }
    Ok(())
}

fn delta_neutral(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 20 && b.read_bool()? {
        b.contract.delta_neutral_contract = Some(DeltaNeutralContract {
            con_id: b.read_int()?,
            delta: b.read_double()?,
            price: b.read_double()?,
        });
    }
    Ok(())
}

fn algo_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 21 {
        b.order.algo_strategy = b.read_string()?;
        if !b.order.algo_strategy.is_empty() {
            b.order.algo_params = b.read_tag_values()?;
        }
    }
    Ok(())
}

fn solicited(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 33 {
        b.order.solicited = b.read_bool()?;
    }
    Ok(())
}

fn what_if_and_commission(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version < 16 {
        return Ok(());
    }
    b.order.what_if = b.read_bool()?;
    order_status(b)?;

    let state = &mut b.order_state;
    if b.server_version >= min_server_ver::WHAT_IF_EXT_FIELDS {
        state.init_margin_before = b.reader.read_string()?;
        state.maint_margin_before = b.reader.read_string()?;
        state.equity_with_loan_before = b.reader.read_string()?;
        state.init_margin_change = b.reader.read_string()?;
        state.maint_margin_change = b.reader.read_string()?;
        state.equity_with_loan_change = b.reader.read_string()?;
    }
    state.init_margin_after = b.reader.read_string()?;
    state.maint_margin_after = b.reader.read_string()?;
    state.equity_with_loan_after = b.reader.read_string()?;
    state.commission = b.reader.read_double_or_absent()?;
    state.min_commission = b.reader.read_double_or_absent()?;
    state.max_commission = b.reader.read_double_or_absent()?;
    state.commission_currency = b.reader.read_string()?;
    state.warning_text = b.reader.read_string()?;
    Ok(())
}

fn order_status(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    b.order_state.status = b.read_string()?;
    Ok(())
}

fn vol_randomize_flags(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.version >= 34 {
        b.order.randomize_size = b.read_bool()?;
        b.order.randomize_price = b.read_bool()?;
    }
    Ok(())
}

fn peg_to_bench_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    let is_peg_bench = matches!(b.order.order_type.as_str(), "PEG BENCH" | "PEGBENCH");
    if b.server_version >= min_server_ver::PEGGED_TO_BENCHMARK && is_peg_bench {
        b.order.reference_contract_id = b.read_int()?;
        b.order.is_pegged_change_amount_decrease = b.read_bool()?;
        b.order.pegged_change_amount = b.read_double()?;
        b.order.reference_change_amount = b.read_double()?;
        b.order.reference_exchange_id = b.read_string()?;
    }
    Ok(())
}

fn conditions(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version < min_server_ver::PEGGED_TO_BENCHMARK {
        return Ok(());
    }
    let count = b.read_int()?;
    if count <= 0 {
        return Ok(());
    }
    for _ in 0..count {
        let condition = read_condition(b)?;
        b.order.conditions.push(condition);
    }
    b.order.conditions_ignore_rth = b.read_bool()?;
    b.order.conditions_cancel_order = b.read_bool()?;
    Ok(())
}

fn read_condition(b: &mut OrderBuilder<'_>) -> DecodeResult<OrderCondition> {
    let kind = b.read_int()?;
    let conjunction = Conjunction::from_wire(&b.read_string()?);

    let condition = match kind {
        condition_type::EXECUTION => OrderCondition::Execution {
            conjunction,
            sec_type: b.read_string()?,
            exchange: b.read_string()?,
            symbol: b.read_string()?,
        },
        condition_type::MARGIN => OrderCondition::Margin {
            conjunction,
            is_more: b.read_bool()?,
            percent: b.read_int()?,
        },
        condition_type::PERCENT_CHANGE => OrderCondition::PercentChange {
            conjunction,
            is_more: b.read_bool()?,
            change_percent: b.read_double()?,
            con_id: b.read_int()?,
            exchange: b.read_string()?,
        },
        condition_type::PRICE => OrderCondition::Price {
            conjunction,
            is_more: b.read_bool()?,
            price: b.read_double()?,
            con_id: b.read_int()?,
            exchange: b.read_string()?,
            trigger_method: b.read_int()?,
        },
        condition_type::TIME => OrderCondition::Time {
            conjunction,
            is_more: b.read_bool()?,
            time: b.read_string()?,
        },
        condition_type::VOLUME => OrderCondition::Volume {
            conjunction,
            is_more: b.read_bool()?,
            volume: b.read_int()?,
            con_id: b.read_int()?,
            exchange: b.read_string()?,
        },
        other => return Err(DecodeError::UnknownConditionType(other)),
    };
    Ok(condition)
}

fn stop_price_and_lmt_price_offset(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    b.order.trail_stop_price = b.read_double_or_absent()?;
    b.order.lmt_price_offset = b.read_double_or_absent()?;
    Ok(())
}

fn adjusted_order_params(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version >= min_server_ver::PEGGED_TO_BENCHMARK {
        b.order.adjusted_order_type = b.read_string()?;
        b.order.trigger_price = b.read_double_or_absent()?;
        stop_price_and_lmt_price_offset(b)?;
        b.order.adjusted_stop_price = b.read_double_or_absent()?;
        b.order.adjusted_stop_limit_price = b.read_double_or_absent()?;
        b.order.adjusted_trailing_amount = b.read_double_or_absent()?;
        b.order.adjustable_trailing_unit = b.read_int()?;
    }
    Ok(())
}

fn soft_dollar_tier(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version >= min_server_ver::SOFT_DOLLAR_TIER {
        b.order.soft_dollar_tier = Some(SoftDollarTier {
            name: b.read_string()?,
            value: b.read_string()?,
            display_name: b.read_string()?,
        });
    }
    Ok(())
}

fn cash_qty(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version >= min_server_ver::CASH_QTY {
        b.order.cash_qty = b.read_double_or_absent()?;
    }
    Ok(())
}

fn dont_use_auto_price_for_hedge(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version >= min_server_ver::AUTO_PRICE_FOR_HEDGE {
        b.order.dont_use_auto_price_for_hedge = b.read_bool()?;
    }
    Ok(())
}

fn is_oms_container(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version >= min_server_ver::ORDER_CONTAINER {
        b.order.is_oms_container = b.read_bool()?;
    }
    Ok(())
}

fn discretionary_up_to_limit_price(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version >= min_server_ver::D_PEG_ORDERS {
        b.order.discretionary_up_to_limit_price = b.read_bool()?;
    }
    Ok(())
}

fn use_price_mgmt_algo(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    if b.server_version >= min_server_ver::PRICE_MGMT_ALGO {
        b.order.use_price_mgmt_algo = b.read_bool()?;
    }
    Ok(())
}

fn completed_tail(b: &mut OrderBuilder<'_>) -> DecodeResult<()> {
    b.order.auto_cancel_date = b.read_string()?;
    b.order.filled_quantity = b.read_decimal()?;
    b.order.ref_futures_con_id = b.read_int()?;
    b.order.auto_cancel_parent = b.read_bool()?;
    b.order.shareholder = b.read_string()?;
    b.order.imbalance_only = b.read_bool()?;
    b.order.route_marketable_to_bbo = b.read_bool()?;
    b.order.parent_perm_id = b.read_long()?;
    b.order_state.completed_time = b.read_string()?;
    b.order_state.completed_status = b.read_string()?;
    Ok(())
}
