use crate::contracts::encode_erc20_approve;
use crate::error::*;
use crate::{err_custom_create, err_from};
use web3::transports::Http;
use web3::types::{Address, Bytes, CallRequest, H256, U256, U64};
use web3::Web3;

/// A state-changing contract call, ready to be signed and broadcast by a
/// wallet. Value is always zero, an approval moves no native currency.
#[derive(Debug, Clone)]
pub struct ContractCall {
    pub chain_id: i64,
    pub from: Address,
    pub to: Address,
    pub call_data: Vec<u8>,
}

impl ContractCall {
    pub fn to_call_request(&self) -> CallRequest {
        CallRequest {
            from: Some(self.from),
            to: Some(self.to),
            gas: None,
            gas_price: None,
            value: None,
            data: Some(Bytes(self.call_data.clone())),
            transaction_type: Some(U64::from(2)),
            access_list: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        }
    }
}

pub fn create_erc20_approve(
    from: Address,
    token: Address,
    spender: Address,
    chain_id: i64,
    amount: U256,
) -> Result<ContractCall, ApprovalError> {
    Ok(ContractCall {
        chain_id,
        from,
        to: token,
        call_data: encode_erc20_approve(spender, amount).map_err(err_from!())?,
    })
}

pub async fn estimate_call_gas(
    web3: &Web3<Http>,
    call: &ContractCall,
) -> Result<U256, ApprovalError> {
    let call_request = call.to_call_request();
    log::debug!("Estimating gas for call: {:?}", call_request);
    let gas_est = match web3.eth().estimate_gas(call_request, None).await {
        Ok(gas_est) => gas_est,
        Err(e) => {
            if e.to_string().contains("gas required exceeds allowance") {
                log::error!("Gas estimation failed - probably insufficient funds: {}", e);
                return Err(err_custom_create!(
                    "Gas estimation failed - probably insufficient funds"
                ));
            }
            return Err(err_custom_create!(
                "Gas estimation failed due to unknown error {}",
                e
            ));
        }
    };

    let add_gas_safety_margin: U256 = U256::from(20000);
    let gas_limit = gas_est + add_gas_safety_margin;
    log::debug!("Set gas limit basing on gas estimation: {gas_est}");
    Ok(gas_limit)
}

#[derive(Debug, Clone, Copy)]
pub struct ReceiptInfo {
    pub block_number: u64,
    pub succeeded: bool,
}

/// Look up the receipt for a broadcast transaction. None while the
/// transaction is unknown to the node or still pending.
pub async fn find_receipt(
    web3: &Web3<Http>,
    tx_hash: H256,
) -> Result<Option<ReceiptInfo>, ApprovalError> {
    let receipt = web3
        .eth()
        .transaction_receipt(tx_hash)
        .await
        .map_err(err_from!())?;
    let Some(receipt) = receipt else {
        return Ok(None);
    };
    let Some(block_number) = receipt.block_number else {
        return Ok(None);
    };
    Ok(Some(ReceiptInfo {
        block_number: block_number.as_u64(),
        succeeded: receipt.status == Some(U64::from(1)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_create_erc20_approve() {
        let from = Address::from_str("0xaaaaaaaaaabbbbbbbbbbccccccccccdddddddddd").unwrap();
        let token = Address::from_str("0x55d398326f99059fF775485246999027B3197955").unwrap();
        let spender = Address::from_str("0x1111111111222222222233333333334444444444").unwrap();

        let call = create_erc20_approve(from, token, spender, 56, U256::from(1)).unwrap();
        assert_eq!(call.chain_id, 56);
        assert_eq!(call.to, token);
        assert_eq!(&call.call_data[0..4], &[0x09, 0x5e, 0xa7, 0xb3]);

        let req = call.to_call_request();
        assert_eq!(req.to, Some(token));
        assert_eq!(req.transaction_type, Some(U64::from(2)));
    }
}
