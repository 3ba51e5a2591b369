use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

// ERC-20 interface
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

// Alpha Router swap entrypoint
sol! {
    interface IAlphaRouter {
        function swapExactInput(
            address tokenIn,
            address tokenOut,
            uint256 amountIn,
            uint256 amountOutMinimum,
            address recipient,
            address[] calldata pools
        ) external payable returns (uint256 amountOut);
    }
}

/// approve(spender, amount) calldata
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    let call = IERC20::approveCall { spender, amount };
    Bytes::from(call.abi_encode())
}

/// swapExactInput calldata
pub fn encode_alpha_swap(
    token_in: Address,
    token_out: Address,
    amount_in: U256,
    amount_out_minimum: U256,
    recipient: Address,
    pools: Vec<Address>,
) -> Bytes {
    let call = IAlphaRouter::swapExactInputCall {
        tokenIn: token_in,
        tokenOut: token_out,
        amountIn: amount_in,
        amountOutMinimum: amount_out_minimum,
        recipient,
        pools,
    };
    Bytes::from(call.abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_selector() {
        let data = encode_approve(Address::repeat_byte(0x11), U256::from(1_000u64));
        // approve(address,uint256)
        assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(data.len(), 4 + 32 * 2);
    }

    #[test]
    fn test_alpha_swap_round_trip() {
        let pools = vec![Address::repeat_byte(0x33), Address::repeat_byte(0x44)];
        let data = encode_alpha_swap(
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
            U256::from(10u64),
            U256::from(9u64),
            Address::repeat_byte(0x05),
            pools.clone(),
        );
        let decoded = IAlphaRouter::swapExactInputCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.amountOutMinimum, U256::from(9u64));
        assert_eq!(decoded.pools, pools);
    }
}
