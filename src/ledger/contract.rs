// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Veridoc Labs

//! Registry contract interface.
//!
//! The contract is an external collaborator with a fixed ABI: an
//! append-only per-address document list plus a verifier allow-list.
//! Events are emitted on-chain but not consumed here.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IIdentityVerification {
        event DocumentUploaded(address indexed user, string documentType, string documentHash);
        event DocumentVerified(address indexed user, address indexed verifier, uint256 docIndex, string status);
        event VerifierAdded(address indexed verifier);
        event VerifierRemoved(address indexed verifier);

        function uploadDocument(string _documentHash, string _documentType) external;
        function verifyDocument(address _user, uint256 _docIndex, string _status, string _notes) external;
        function getDocument(address _user, uint256 _index) external view returns (
            string documentHash,
            string documentType,
            string status,
            uint256 timestamp,
            address verifier,
            string notes
        );
        function getDocumentCount(address _user) external view returns (uint256);
        function isVerifier(address _addr) external view returns (bool);
        function addVerifier(address _verifier) external;
        function removeVerifier(address _verifier) external;
        function owner() external view returns (address);
        function verifiers(address) external view returns (bool);
    }
}
