//! Static matching of call-site arguments against a callee's parameter list.
//!
//! Matching only looks at arities and keyword names, never at types, so the verdict is
//! three-valued: a call with a statically unknown `*args` may or may not bind every parameter.

use cpa_common::util::tvl::Tvl;
use cpa_storegraph::program::{CodeParameters, Param};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// The arguments at a call site. `T` is whatever the caller passes (slots, types, ...); return
/// targets are carried through `map` untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerArgs<T, R = T> {
    pub self_arg: Option<T>,
    pub args: Vec<T>,
    pub kwds: Vec<(String, T)>,
    pub vargs: Option<T>,
    pub kargs: Option<T>,
    // `None` when the call site discards the result.
    pub return_args: Option<Vec<R>>,
}

impl<T, R> CallerArgs<T, R> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> CallerArgs<U, R> {
        CallerArgs {
            self_arg: self.self_arg.map(&mut f),
            args: self.args.into_iter().map(&mut f).collect(),
            kwds: self
                .kwds
                .into_iter()
                .map(|(name, value)| (name, f(value)))
                .collect(),
            vargs: self.vargs.map(&mut f),
            kargs: self.kargs.map(&mut f),
            return_args: self.return_args,
        }
    }
}

/// A contiguous run of caller arguments landing in a contiguous run of parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionalTransfer {
    pub source_begin: usize,
    pub destination_begin: usize,
    pub count: usize,
}

impl PositionalTransfer {
    fn transfer(&mut self, src: usize, dst: usize, count: usize) {
        assert!(count > 0);
        *self = PositionalTransfer {
            source_begin: src,
            destination_begin: dst,
            count,
        };
    }

    fn reset(&mut self) {
        *self = PositionalTransfer::default();
    }

    pub fn is_active(&self) -> bool {
        self.count > 0
    }

    pub fn source_end(&self) -> usize {
        self.source_begin + self.count
    }

    pub fn destination_end(&self) -> usize {
        self.destination_begin + self.count
    }

    /// `(source, destination)` index pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.count).map(move |i| (self.source_begin + i, self.destination_begin + i))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExceptionKind {
    TypeError,
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionKind::TypeError => write!(f, "TypeError"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("self argument does not match the callee (callee takes self: {expected})")]
    SelfMismatch { expected: bool },

    #[error("takes {params} positional arguments but {args} were given")]
    TooManyPositional { params: usize, args: usize },

    #[error("got multiple values for argument '{0}'")]
    MultipleValues(String),

    #[error("got an unexpected keyword argument '{0}'")]
    UnexpectedKeyword(String),

    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("callee takes **kwargs, which cannot be bound")]
    UnsupportedKwargs,
}

impl CallError {
    pub fn exception_kind(&self) -> ExceptionKind {
        ExceptionKind::TypeError
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallInfo {
    pub will_succeed: Tvl,
    pub self_transfer: bool,

    pub arg_param: PositionalTransfer,
    pub arg_vparam: PositionalTransfer,

    pub exceptions: BTreeSet<ExceptionKind>,
    /// Every reason the call may fail. Kept when the call is known to fail.
    pub errors: Vec<CallError>,

    /// First parameter an unknown-length `*args` may reach.
    pub uncertain_param_start: Option<usize>,
    /// First `*args` position an unknown-length `*args` may reach.
    pub uncertain_vparam_start: Option<usize>,

    pub certain_keywords: BTreeSet<usize>,
    pub defaults: BTreeSet<usize>,
}

impl CallInfo {
    fn new() -> Self {
        CallInfo {
            will_succeed: Tvl::Maybe,
            self_transfer: false,
            arg_param: PositionalTransfer::default(),
            arg_vparam: PositionalTransfer::default(),
            exceptions: BTreeSet::new(),
            errors: Vec::new(),
            uncertain_param_start: None,
            uncertain_vparam_start: None,
            certain_keywords: BTreeSet::new(),
            defaults: BTreeSet::new(),
        }
    }

    pub fn is_bound(&self, param: usize) -> Tvl {
        if param < self.arg_param.count
            || self.certain_keywords.contains(&param)
            || self.defaults.contains(&param)
        {
            Tvl::True
        } else if self.uncertain_param_start.is_some() {
            Tvl::Maybe
        } else {
            Tvl::False
        }
    }

    fn fail(&mut self, error: CallError) {
        self.exceptions.insert(error.exception_kind());
        self.errors.push(error);
    }

    fn must_fail(&mut self) {
        self.will_succeed = Tvl::False;
        self.self_transfer = false;
        self.arg_param.reset();
        self.arg_vparam.reset();
        self.uncertain_param_start = None;
        self.uncertain_vparam_start = None;
        self.certain_keywords.clear();
        self.defaults.clear();
    }

    pub fn must_fail_with(mut self, error: CallError) -> Self {
        self.fail(error);
        self.must_fail();
        self
    }
}

fn param_name<L>(callee: &CodeParameters<L>, param: usize) -> String {
    match callee.param_names.get(param) {
        Some(name) => name.clone(),
        None => format!("#{}", param),
    }
}

/// Marks every trailing parameter with a default that is not surely bound as defaulting.
pub fn bind_defaults<L>(callee: &CodeParameters<L>, info: &mut CallInfo) {
    let num_params = callee.params.len();
    let offset = num_params.saturating_sub(callee.defaults.len());
    for param in offset..num_params {
        if info.is_bound(param).maybe_false() {
            info.defaults.insert(param);
        }
    }
}

pub fn call_stack_to_params_info<L>(
    callee: &CodeParameters<L>,
    self_arg: bool,
    num_args: usize,
    uncertain_vargs: bool,
    certain_kwds: &[&str],
    uncertain_kwds: bool,
) -> CallInfo {
    assert!(!uncertain_kwds, "uncertain keyword arguments are not supported");

    let mut info = CallInfo::new();

    match &callee.self_param {
        Some(Param::DoNotCare) => info.self_transfer = false,
        Some(Param::Local(_)) if self_arg => info.self_transfer = true,
        None if !self_arg => info.self_transfer = false,
        _ => {
            return info.must_fail_with(CallError::SelfMismatch {
                expected: callee.self_param.is_some(),
            })
        }
    }

    let num_params = callee.params.len();
    let mut clean_transfer = Tvl::True;

    // arg -> param
    let to_params = num_args.min(num_params);
    if to_params > 0 {
        info.arg_param.transfer(0, 0, to_params);
    }
    let param = to_params;

    // arg -> vparam
    let overflow = num_args - to_params;
    let mut vparam = 0;
    if overflow > 0 {
        if callee.vparam.is_some() {
            info.arg_vparam.transfer(to_params, vparam, overflow);
            vparam += overflow;
        } else {
            return info.must_fail_with(CallError::TooManyPositional {
                params: num_params,
                args: num_args,
            });
        }
    }

    if uncertain_vargs {
        if param < num_params {
            info.uncertain_param_start = Some(param);
        }
        if callee.vparam.is_some() {
            info.uncertain_vparam_start = Some(vparam);
        } else {
            // Without a vparam, the uncertain arguments may overflow.
            info.exceptions.insert(ExceptionKind::TypeError);
            clean_transfer &= Tvl::Maybe;
        }
    }

    for &kwd in certain_kwds {
        match callee.param_names.iter().position(|name| name == kwd) {
            Some(param) => {
                let bound = info.is_bound(param);
                if bound.must_be_false() {
                    info.certain_keywords.insert(param);
                } else if bound.must_be_true() {
                    return info.must_fail_with(CallError::MultipleValues(kwd.to_owned()));
                } else {
                    info.fail(CallError::MultipleValues(kwd.to_owned()));
                    info.certain_keywords.insert(param);
                    clean_transfer &= Tvl::Maybe;
                }
            }
            None if callee.kparam.is_none() => {
                return info.must_fail_with(CallError::UnexpectedKeyword(kwd.to_owned()));
            }
            None => panic!(
                "Temporary limitation: cannot pass keyword '{}' through **kwargs",
                kwd
            ),
        }
    }

    bind_defaults(callee, &mut info);

    let mut completely_bound = Tvl::True;
    for param in 0..num_params {
        let bound = info.is_bound(param);
        if bound.maybe_false() {
            info.errors
                .push(CallError::MissingArgument(param_name(callee, param)));
        }
        completely_bound &= bound;
    }

    info.will_succeed = completely_bound & clean_transfer;

    if info.will_succeed.maybe_false() {
        info.exceptions.insert(ExceptionKind::TypeError);
    }

    if info.will_succeed.must_be_false() {
        info.must_fail();
    }

    info
}
