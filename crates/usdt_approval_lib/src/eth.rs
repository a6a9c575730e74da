use crate::contracts::{encode_erc20_allowance, encode_erc20_decimals};
use crate::error::*;
use crate::{err_custom_create, err_from};
use secp256k1::{PublicKey, SecretKey};
use sha3::Digest;
use sha3::Keccak256;
use web3::transports::Http;
use web3::types::{Address, Bytes, CallRequest, U256};
use web3::Web3;

pub fn get_eth_addr_from_secret(secret_key: &SecretKey) -> Address {
    Address::from_slice(
        &Keccak256::digest(
            &PublicKey::from_secret_key(&secp256k1::Secp256k1::new(), secret_key)
                .serialize_uncompressed()[1..65],
        )
        .as_slice()[12..],
    )
}

pub async fn check_allowance(
    web3: &Web3<Http>,
    owner: Address,
    token: Address,
    spender: Address,
) -> Result<U256, ApprovalError> {
    log::debug!("Checking token {token:#x} for allowance...");
    let call_request = CallRequest {
        from: Some(owner),
        to: Some(token),
        gas: None,
        gas_price: None,
        value: None,
        data: Some(Bytes(
            encode_erc20_allowance(owner, spender).map_err(err_from!())?,
        )),
        transaction_type: None,
        access_list: None,
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
    };
    let res = web3
        .eth()
        .call(call_request, None)
        .await
        .map_err(err_from!())?;
    if res.0.len() != 32 {
        return Err(err_custom_create!(
            "Invalid response from ERC20 allowance check {:?}",
            res
        ));
    };
    let allowance = U256::from_big_endian(&res.0);
    log::debug!(
        "Check allowance: owner: {:?}, token: {:?}, spender: {:?}, allowance: {:?}",
        owner,
        token,
        spender,
        allowance
    );

    Ok(allowance)
}

pub async fn get_token_decimals(
    web3: &Web3<Http>,
    token: Address,
) -> Result<u8, ApprovalError> {
    let call_request = CallRequest {
        from: None,
        to: Some(token),
        gas: None,
        gas_price: None,
        value: None,
        data: Some(Bytes(encode_erc20_decimals().map_err(err_from!())?)),
        transaction_type: None,
        access_list: None,
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
    };
    let res = web3
        .eth()
        .call(call_request, None)
        .await
        .map_err(err_from!())?;
    decode_erc20_decimals(&res.0, token)
}

pub fn decode_erc20_decimals(bytes: &[u8], token: Address) -> Result<u8, ApprovalError> {
    if bytes.len() != 32 {
        return Err(err_custom_create!(
            "Invalid decimals response: {:?}. Probably not a valid ERC20 contract {:#x}",
            bytes,
            token
        ));
    }
    let decimals = U256::from_big_endian(bytes);
    if decimals > U256::from(u8::MAX) {
        return Err(err_custom_create!(
            "Decimals {} out of range for token {:#x}",
            decimals,
            token
        ));
    }
    Ok(decimals.as_u64() as u8)
}
