// src/contract/encoder.rs

use std::str::FromStr;

use ethers_core::abi::{Function, ParamType, Token};
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use thiserror::Error;

use super::{ContractDescriptor, DescriptorError, FunctionSpec};
use crate::tools::args::ArgValue;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("{function} expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("argument '{param}' of {function} has type {expected}, which this value cannot encode")]
    TypeMismatch {
        function: String,
        param: String,
        expected: String,
    },
    #[error("invalid address '{token}'")]
    InvalidAddress { token: String },
    #[error("{function} is not payable but a value of {value} wei was supplied")]
    ValueNotPayable { function: String, value: U256 },
    #[error("ABI encoding failed: {0}")]
    Abi(#[from] ethers_core::abi::Error),
}

impl EncodingError {
    /// Errors caused by the caller's text rather than a descriptor/registry mismatch.
    pub fn is_user_input(&self) -> bool {
        matches!(self, EncodingError::InvalidAddress { .. })
    }
}

/// A fully parsed tool invocation, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub function_name: String,
    pub args: Vec<ArgValue>,
    pub value_wei: U256,
}

/// Calldata plus the optional native value for a state-changing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    pub function_name: String,
    pub data: Bytes,
    pub value: Option<U256>,
}

impl EncodedCall {
    /// Transaction request addressed to `contract`; gas and nonce are left to the executor.
    pub fn to_transaction_request(&self, contract: Address) -> TransactionRequest {
        let tx = TransactionRequest::new().to(contract).data(self.data.clone());
        match self.value {
            Some(value) => tx.value(value),
            None => tx,
        }
    }
}

/// Converts parsed arguments into ABI tokens, in the order the function declares them.
pub fn to_tokens(function: &FunctionSpec, args: &[ArgValue]) -> Result<Vec<Token>, EncodingError> {
    if function.inputs.len() != args.len() {
        return Err(EncodingError::ArityMismatch {
            function: function.name.clone(),
            expected: function.inputs.len(),
            found: args.len(),
        });
    }

    function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| match (&param.kind, arg) {
            (ParamType::Address, ArgValue::Address(token)) => Address::from_str(token)
                .map(Token::Address)
                .map_err(|_| EncodingError::InvalidAddress {
                    token: token.clone(),
                }),
            (ParamType::Uint(_), ArgValue::Uint(n)) => Ok(Token::Uint(*n)),
            _ => Err(EncodingError::TypeMismatch {
                function: function.name.clone(),
                param: param.name.clone(),
                expected: param.solidity_type.clone(),
            }),
        })
        .collect()
}

/// ABI-encodes `call` against the descriptor. The value is attached only to payable
/// functions and only when non-zero.
pub fn encode_call(
    descriptor: &ContractDescriptor,
    call: &ParsedCall,
) -> Result<EncodedCall, EncodingError> {
    let function = descriptor.lookup(&call.function_name)?;

    if !call.value_wei.is_zero() && !function.mutability.is_payable() {
        return Err(EncodingError::ValueNotPayable {
            function: function.name.clone(),
            value: call.value_wei,
        });
    }

    let tokens = to_tokens(function, &call.args)?;
    let data = encode_input(function.abi_function(), &tokens)?;

    let value = (function.mutability.is_payable() && !call.value_wei.is_zero())
        .then_some(call.value_wei);

    Ok(EncodedCall {
        function_name: function.name.clone(),
        data,
        value,
    })
}

/// Selector followed by the encoded arguments.
pub fn encode_input(function: &Function, tokens: &[Token]) -> Result<Bytes, EncodingError> {
    Ok(Bytes::from(function.encode_input(tokens)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::DEFAULT_CONTRACT_ADDRESS;

    const TOKEN: &str = "0xab5801a7d398351b8be11c439e05c5b3259aec9b";

    fn descriptor() -> ContractDescriptor {
        let address = Address::from_str(DEFAULT_CONTRACT_ADDRESS).unwrap();
        ContractDescriptor::with_default_abi(address).unwrap()
    }

    fn call(name: &str, args: Vec<ArgValue>, value_wei: u64) -> ParsedCall {
        ParsedCall {
            function_name: name.to_string(),
            args,
            value_wei: U256::from(value_wei),
        }
    }

    #[test]
    fn deposit_erc20_round_trips_through_the_abi() {
        let descriptor = descriptor();
        let encoded = encode_call(
            &descriptor,
            &call(
                "depositERC20",
                vec![ArgValue::Address(TOKEN.into()), ArgValue::Uint(U256::from(5000u64))],
                0,
            ),
        )
        .unwrap();

        let function = descriptor.lookup("depositERC20").unwrap().abi_function();
        assert_eq!(&encoded.data[..4], &function.short_signature()[..]);
        // keccak256("depositERC20(address,uint256)")[..4]
        assert_eq!(hex::encode(&encoded.data[..4]), "97feb926");

        let decoded = function.decode_input(&encoded.data[4..]).unwrap();
        assert_eq!(
            decoded,
            vec![
                Token::Address(Address::from_str(TOKEN).unwrap()),
                Token::Uint(U256::from(5000u64)),
            ]
        );
        assert_eq!(encoded.value, None);
    }

    #[test]
    fn payable_deposit_carries_value() {
        let encoded = encode_call(&descriptor(), &call("deposit", vec![], 100_000_000_000_000))
            .unwrap();
        assert_eq!(encoded.value, Some(U256::from(100_000_000_000_000u64)));
        assert_eq!(encoded.data.len(), 4);

        let tx = encoded.to_transaction_request(Address::zero());
        assert_eq!(tx.value, Some(U256::from(100_000_000_000_000u64)));
        assert_eq!(tx.data, Some(encoded.data.clone()));
    }

    #[test]
    fn zero_value_is_not_attached() {
        let encoded = encode_call(&descriptor(), &call("deposit", vec![], 0)).unwrap();
        assert_eq!(encoded.value, None);
        assert_eq!(encoded.to_transaction_request(Address::zero()).value, None);
    }

    #[test]
    fn value_on_non_payable_function_is_a_defect() {
        let err = encode_call(&descriptor(), &call("incrementCounter", vec![], 1)).unwrap_err();
        assert!(matches!(err, EncodingError::ValueNotPayable { .. }));
        assert!(!err.is_user_input());
    }

    #[test]
    fn malformed_address_fails_at_encoding() {
        let err = encode_call(
            &descriptor(),
            &call(
                "withdraw",
                vec![ArgValue::Address("0xReceiver".into()), ArgValue::Uint(U256::one())],
                0,
            ),
        )
        .unwrap_err();
        assert!(err.is_user_input());
        assert_eq!(err.to_string(), "invalid address '0xReceiver'");
    }

    #[test]
    fn arity_and_type_mismatches_are_defects() {
        let descriptor = descriptor();
        let err = encode_call(&descriptor, &call("withdraw", vec![], 0)).unwrap_err();
        assert!(matches!(err, EncodingError::ArityMismatch { expected: 2, found: 0, .. }));

        let err = encode_call(
            &descriptor,
            &call("getERC20Balance", vec![ArgValue::Uint(U256::one())], 0),
        )
        .unwrap_err();
        assert!(matches!(err, EncodingError::TypeMismatch { .. }));
        assert!(!err.is_user_input());

        let err = encode_call(&descriptor, &call("nope", vec![], 0)).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::Descriptor(DescriptorError::UnknownFunction(_))
        ));
    }
}
