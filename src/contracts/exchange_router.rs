//! ExchangeRouter contract bindings
//!
//! All state-changing protocol actions go through `multicall` so that funding the vault
//! (execution fee, collateral) and creating the request land in one transaction.

use alloy::sol;

sol! {
    /// Addresses part of an order request
    #[derive(Debug, Default)]
    struct CreateOrderParamsAddresses {
        address receiver;
        address cancellationReceiver;
        address callbackContract;
        address uiFeeReceiver;
        address market;
        address initialCollateralToken;
        address[] swapPath;
    }

    /// Numeric part of an order request
    #[derive(Debug, Default)]
    struct CreateOrderParamsNumbers {
        uint256 sizeDeltaUsd;                  // USD (30 decimals)
        uint256 initialCollateralDeltaAmount;  // Collateral token decimals
        uint256 triggerPrice;                  // 0 for market orders
        uint256 acceptablePrice;               // 30 - index token decimals
        uint256 executionFee;                  // Native token (18 decimals)
        uint256 callbackGasLimit;
        uint256 minOutputAmount;
        uint256 validFromTime;
    }

    /// Order creation request
    #[derive(Debug, Default)]
    struct CreateOrderParams {
        CreateOrderParamsAddresses addresses;
        CreateOrderParamsNumbers numbers;
        uint8 orderType;
        uint8 decreasePositionSwapType;
        bool isLong;
        bool shouldUnwrapNativeToken;
        bool autoCancel;
        bytes32 referralCode;
        bytes32[] dataList;
    }

    /// Addresses part of a deposit request
    #[derive(Debug, Default)]
    struct CreateDepositParamsAddresses {
        address receiver;
        address callbackContract;
        address uiFeeReceiver;
        address market;
        address initialLongToken;
        address initialShortToken;
        address[] longTokenSwapPath;
        address[] shortTokenSwapPath;
    }

    /// Liquidity deposit request (mints GM tokens)
    #[derive(Debug, Default)]
    struct CreateDepositParams {
        CreateDepositParamsAddresses addresses;
        uint256 minMarketTokens;
        bool shouldUnwrapNativeToken;
        uint256 executionFee;
        uint256 callbackGasLimit;
        bytes32[] dataList;
    }

    /// Addresses part of a withdrawal request
    #[derive(Debug, Default)]
    struct CreateWithdrawalParamsAddresses {
        address receiver;
        address callbackContract;
        address uiFeeReceiver;
        address market;
        address[] longTokenSwapPath;
        address[] shortTokenSwapPath;
    }

    /// Liquidity withdrawal request (burns GM tokens)
    #[derive(Debug, Default)]
    struct CreateWithdrawalParams {
        CreateWithdrawalParamsAddresses addresses;
        uint256 minLongTokenAmount;
        uint256 minShortTokenAmount;
        bool shouldUnwrapNativeToken;
        uint256 executionFee;
        uint256 callbackGasLimit;
        bytes32[] dataList;
    }

    /// ExchangeRouter interface
    #[sol(rpc)]
    interface IExchangeRouter {
        /// Execute several router calls atomically
        function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);

        /// Wrap msg.value and send it to a vault
        function sendWnt(address receiver, uint256 amount) external payable;

        /// Transfer approved tokens from the caller to a vault
        function sendTokens(address token, address receiver, uint256 amount) external payable;

        /// Create an increase/decrease/swap order
        function createOrder(CreateOrderParams calldata params) external payable returns (bytes32);

        /// Create a liquidity deposit
        function createDeposit(CreateDepositParams calldata params) external payable returns (bytes32);

        /// Create a liquidity withdrawal
        function createWithdrawal(CreateWithdrawalParams calldata params) external payable returns (bytes32);
    }
}
